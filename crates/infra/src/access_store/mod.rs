//! Backing stores for the access gate's read-only collaborators.
//!
//! Both flavours implement `TenantDirectory`, `PageCatalog` and
//! `PermissionMatrix` from `edugate-auth`.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryPageCatalog, InMemoryPermissionMatrix, InMemoryTenantDirectory};
pub use postgres::PostgresAccessStore;
