//! Collaborator wiring: stores behind the gate and the session store.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use edugate_auth::{AccessGate, PageCatalog, PermissionMatrix, TenantDirectory};
use edugate_infra::{
    InMemoryPageCatalog, InMemoryPermissionMatrix, InMemorySessionStore, InMemoryTenantDirectory,
    PostgresAccessStore, SessionStore,
};

use crate::config::ApiConfig;
use crate::middleware::{GateState, Hs256TokenVerifier};

/// Concrete in-memory stores (dev/test). Kept around so callers can seed them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStores {
    pub directory: Arc<InMemoryTenantDirectory>,
    pub catalog: Arc<InMemoryPageCatalog>,
    pub matrix: Arc<InMemoryPermissionMatrix>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Type-erased collaborators the gate runs over.
#[derive(Clone)]
pub struct GateServices {
    pub directory: Arc<dyn TenantDirectory>,
    pub catalog: Arc<dyn PageCatalog>,
    pub matrix: Arc<dyn PermissionMatrix>,
    pub sessions: Arc<dyn SessionStore>,
}

impl GateServices {
    pub fn in_memory(stores: &InMemoryStores) -> Self {
        Self {
            directory: stores.directory.clone(),
            catalog: stores.catalog.clone(),
            matrix: stores.matrix.clone(),
            sessions: stores.sessions.clone(),
        }
    }

    /// Postgres-backed directory, catalog and matrix; sessions stay in memory.
    pub async fn postgres(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Arc::new(PostgresAccessStore::new(pool));
        Ok(Self {
            directory: store.clone(),
            catalog: store.clone(),
            matrix: store,
            sessions: Arc::new(InMemorySessionStore::new()),
        })
    }

    pub fn into_state(self, config: &ApiConfig) -> GateState {
        let gate = AccessGate::new(self.directory, self.catalog, self.matrix, config.gate.clone());
        GateState {
            gate: Arc::new(gate),
            sessions: self.sessions,
            tokens: Arc::new(Hs256TokenVerifier::new(config.token_secret.as_bytes())),
            cookies: Arc::new(config.cookies.clone()),
            trust_forwarded_host: config.trust_forwarded_host,
        }
    }
}

/// Pick stores from configuration: Postgres when a database URL is set.
pub async fn build_services(config: &ApiConfig) -> Result<GateServices, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres-backed access stores");
            GateServices::postgres(url).await
        }
        None => Ok(GateServices::in_memory(&InMemoryStores::new())),
    }
}
