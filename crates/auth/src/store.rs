//! Read-only collaborator interfaces consumed by the gate.
//!
//! Implementations live in infrastructure crates (in-memory, Postgres). Every
//! call may block on external I/O, hence async.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use edugate_core::{GroupId, PageId, TenantId};

use crate::capability::PermissionGrant;
use crate::page::Page;

/// Failure talking to a backing store.
///
/// These never become a business outcome: the gate converts them into a deny.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("malformed store record: {0}")]
    Decode(String),
}

/// A tenant ("root") as registered in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub tenant_id: TenantId,
    pub domain: String,
    pub active: bool,
}

/// Maps a network identity (host name) to the tenant that owns it.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up the tenant registered for `host` (case-insensitive), active or not.
    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError>;

    /// Resolve `host` to an *active* tenant. Inactive or unknown hosts yield `None`.
    async fn resolve_tenant(&self, host: &str) -> Result<Option<TenantId>, StoreError> {
        Ok(self
            .lookup_domain(host)
            .await?
            .filter(|record| record.active)
            .map(|record| record.tenant_id))
    }
}

/// Catalog of registered application pages.
#[async_trait]
pub trait PageCatalog: Send + Sync {
    /// Page whose canonical path or name equals `requested` (case-insensitive).
    async fn find_exact(&self, requested: &str) -> Result<Option<Page>, StoreError>;

    /// Pages whose canonical path is a segment prefix or suffix of `requested`.
    ///
    /// Implementations may over-approximate; the resolver re-checks candidates.
    async fn find_partial(&self, requested: &str) -> Result<Vec<Page>, StoreError>;

    /// Full listing, used for diagnostics only.
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError>;
}

/// Stored grants keyed by (group, page).
#[async_trait]
pub trait PermissionMatrix: Send + Sync {
    async fn grant(
        &self,
        group_id: GroupId,
        page_id: PageId,
    ) -> Result<Option<PermissionGrant>, StoreError>;
}

#[async_trait]
impl<S> TenantDirectory for Arc<S>
where
    S: TenantDirectory + ?Sized,
{
    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError> {
        (**self).lookup_domain(host).await
    }

    async fn resolve_tenant(&self, host: &str) -> Result<Option<TenantId>, StoreError> {
        (**self).resolve_tenant(host).await
    }
}

#[async_trait]
impl<S> PageCatalog for Arc<S>
where
    S: PageCatalog + ?Sized,
{
    async fn find_exact(&self, requested: &str) -> Result<Option<Page>, StoreError> {
        (**self).find_exact(requested).await
    }

    async fn find_partial(&self, requested: &str) -> Result<Vec<Page>, StoreError> {
        (**self).find_partial(requested).await
    }

    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        (**self).list_pages().await
    }
}

#[async_trait]
impl<S> PermissionMatrix for Arc<S>
where
    S: PermissionMatrix + ?Sized,
{
    async fn grant(
        &self,
        group_id: GroupId,
        page_id: PageId,
    ) -> Result<Option<PermissionGrant>, StoreError> {
        (**self).grant(group_id, page_id).await
    }
}
