//! Minimal collaborator fakes for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;

use edugate_core::{GroupId, PageId, TenantId};

use crate::capability::PermissionGrant;
use crate::page::Page;
use crate::session::SessionControl;
use crate::store::{PageCatalog, PermissionMatrix, StoreError, TenantDirectory, TenantRecord};

fn outage() -> StoreError {
    StoreError::Unavailable("fake outage".to_string())
}

#[derive(Debug, Default)]
pub struct FakeDirectory {
    records: Vec<TenantRecord>,
    failing: bool,
    hang: bool,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// A directory whose lookups never complete.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, domain: &str, tenant: i64, active: bool) -> Self {
        self.records.push(TenantRecord {
            tenant_id: TenantId::new(tenant),
            domain: domain.to_string(),
            active,
        });
        self
    }
}

#[async_trait]
impl TenantDirectory for FakeDirectory {
    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(outage());
        }
        Ok(self
            .records
            .iter()
            .find(|r| r.domain.eq_ignore_ascii_case(host))
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct FakeCatalog {
    pages: Vec<Page>,
    failing: bool,
    listing_fails: bool,
}

impl FakeCatalog {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Lookups work but the diagnostic listing fails.
    pub fn without_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }
}

#[async_trait]
impl PageCatalog for FakeCatalog {
    async fn find_exact(&self, requested: &str) -> Result<Option<Page>, StoreError> {
        if self.failing {
            return Err(outage());
        }
        Ok(self.pages.iter().find(|p| p.matches_exactly(requested)).cloned())
    }

    async fn find_partial(&self, requested: &str) -> Result<Vec<Page>, StoreError> {
        if self.failing {
            return Err(outage());
        }
        Ok(self
            .pages
            .iter()
            .filter(|p| p.matches_partially(requested))
            .cloned()
            .collect())
    }

    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        if self.failing || self.listing_fails {
            return Err(outage());
        }
        Ok(self.pages.clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeMatrix {
    grants: HashMap<(GroupId, PageId), PermissionGrant>,
    failing: bool,
}

impl FakeMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, group: i64, page: i64, create: bool, update: bool, delete: bool) -> Self {
        let grant = PermissionGrant {
            group_id: GroupId::new(group),
            page_id: PageId::new(page),
            create,
            update,
            delete,
        };
        self.grants.insert((grant.group_id, grant.page_id), grant);
        self
    }
}

#[async_trait]
impl PermissionMatrix for FakeMatrix {
    async fn grant(
        &self,
        group_id: GroupId,
        page_id: PageId,
    ) -> Result<Option<PermissionGrant>, StoreError> {
        if self.failing {
            return Err(outage());
        }
        Ok(self.grants.get(&(group_id, page_id)).copied())
    }
}

/// Session handle that records what was applied to it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    pub confirmed: Option<TenantId>,
    pub cleared: bool,
    pub signed_out: bool,
}

impl SessionControl for RecordingSession {
    fn confirm_tenant(&mut self, tenant_id: TenantId) {
        self.confirmed = Some(tenant_id);
    }

    fn clear(&mut self) {
        self.confirmed = None;
        self.cleared = true;
    }

    fn sign_out(&mut self) {
        self.signed_out = true;
    }
}
