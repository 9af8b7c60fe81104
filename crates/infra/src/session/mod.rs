//! Per-connection session state read and mutated by the gate pipeline.

pub mod in_memory;

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use edugate_core::TenantId;

pub use in_memory::InMemorySessionStore;

/// Opaque session identifier (carried in the session cookie).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s.trim())?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Tenant recorded when the session was opened (at sign-in).
    pub recorded_tenant: Option<TenantId>,
    /// Tenant confirmed by the most recent consistent gate check.
    pub confirmed_tenant: Option<TenantId>,
    pub created_at: DateTime<Utc>,
}

/// Session persistence. Every mutation targets a single session id and is
/// idempotent.
pub trait SessionStore: Send + Sync {
    fn open(&self, recorded_tenant: TenantId) -> SessionId;
    fn get(&self, id: SessionId) -> Option<SessionRecord>;
    fn confirm_tenant(&self, id: SessionId, tenant_id: TenantId);
    fn remove(&self, id: SessionId);
}

impl<S> SessionStore for std::sync::Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn open(&self, recorded_tenant: TenantId) -> SessionId {
        (**self).open(recorded_tenant)
    }

    fn get(&self, id: SessionId) -> Option<SessionRecord> {
        (**self).get(id)
    }

    fn confirm_tenant(&self, id: SessionId, tenant_id: TenantId) {
        (**self).confirm_tenant(id, tenant_id)
    }

    fn remove(&self, id: SessionId) {
        (**self).remove(id)
    }
}
