use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use chrono::Utc;

use edugate_core::TenantId;

use super::{SessionId, SessionRecord, SessionStore};

/// In-memory session store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes go through even on a poisoned lock: a clear must never be lost.
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionRecord>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::error!("session store lock poisoned, writing through");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl SessionStore for InMemorySessionStore {
    fn open(&self, recorded_tenant: TenantId) -> SessionId {
        let id = SessionId::new();
        self.write().insert(
            id,
            SessionRecord {
                recorded_tenant: Some(recorded_tenant),
                confirmed_tenant: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    fn get(&self, id: SessionId) -> Option<SessionRecord> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    fn confirm_tenant(&self, id: SessionId, tenant_id: TenantId) {
        if let Some(record) = self.write().get_mut(&id) {
            record.confirmed_tenant = Some(tenant_id);
        }
    }

    fn remove(&self, id: SessionId) {
        self.write().remove(&id);
    }
}
