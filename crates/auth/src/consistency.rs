//! Three-way tenant consistency check.
//!
//! The tenant a principal claims, the tenant recorded in its session and the
//! tenant that owns the request's host must all be the same. The host-derived
//! value is the only one the caller cannot forge, so the check is never
//! reduced to two of the three.

use edugate_core::TenantId;

use crate::principal::Principal;
use crate::session::SessionEffect;
use crate::store::{StoreError, TenantDirectory};

/// Outcome of the consistency check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TenantCheck {
    /// All three sources agree on this tenant.
    Confirmed(TenantId),
    /// The host does not map to an active tenant.
    DomainUnrecognized,
    /// Claim or session value absent or malformed.
    MissingIdentity,
    /// The sources disagree: treated as credential replay.
    Mismatch {
        claimed: TenantId,
        recorded: TenantId,
        domain: TenantId,
    },
}

impl TenantCheck {
    /// Session side effects this outcome demands.
    pub fn effects(&self, persist_confirmed: bool) -> Vec<SessionEffect> {
        match *self {
            TenantCheck::Confirmed(tenant_id) if persist_confirmed => {
                vec![SessionEffect::ConfirmTenant(tenant_id)]
            }
            TenantCheck::Mismatch { .. } => {
                vec![SessionEffect::ClearSession, SessionEffect::SignOut]
            }
            _ => Vec::new(),
        }
    }
}

pub fn tenants_agree(claimed: TenantId, recorded: TenantId, domain: TenantId) -> bool {
    claimed == recorded && recorded == domain
}

#[derive(Debug, Clone)]
pub struct DomainConsistencyChecker<D> {
    directory: D,
}

impl<D: TenantDirectory> DomainConsistencyChecker<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Run the check for one request. Fail-closed: anything not provably
    /// consistent is a non-`Confirmed` outcome.
    pub async fn check(
        &self,
        host: Option<&str>,
        principal: &Principal,
        recorded: Option<TenantId>,
    ) -> Result<TenantCheck, StoreError> {
        let host = match host.map(str::trim) {
            Some(host) if !host.is_empty() => host,
            _ => return Ok(TenantCheck::DomainUnrecognized),
        };

        let Some(domain) = self.directory.resolve_tenant(host).await? else {
            return Ok(TenantCheck::DomainUnrecognized);
        };
        let Some(claimed) = principal.claimed_tenant() else {
            return Ok(TenantCheck::MissingIdentity);
        };
        let Some(recorded) = recorded else {
            return Ok(TenantCheck::MissingIdentity);
        };

        if tenants_agree(claimed, recorded, domain) {
            Ok(TenantCheck::Confirmed(domain))
        } else {
            Ok(TenantCheck::Mismatch {
                claimed,
                recorded,
                domain,
            })
        }
    }
}
