//! `edugate-auth`: request-time access-control gate (zero-trust, fail-closed).
//!
//! This crate is intentionally decoupled from HTTP and storage: collaborators
//! (tenant directory, page catalog, permission matrix, session) are traits
//! implemented elsewhere and passed in explicitly.

pub mod capability;
pub mod claims;
pub mod consistency;
pub mod gate;
pub mod page;
pub mod principal;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{Capability, PermissionGrant, evaluate};
pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use consistency::{DomainConsistencyChecker, TenantCheck, tenants_agree};
pub use gate::{
    Access, AccessGate, AccessRequest, Decision, Denial, DenyReason, GateSettings,
    ProtectedOperation, Verdict,
};
pub use page::{Page, PageResolver};
pub use principal::{ClaimValue, Principal};
pub use session::{SessionControl, SessionEffect};
pub use store::{PageCatalog, PermissionMatrix, StoreError, TenantDirectory, TenantRecord};
