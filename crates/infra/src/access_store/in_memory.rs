//! In-memory collaborator stores for tests/dev.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;

use edugate_auth::{
    Page, PageCatalog, PermissionGrant, PermissionMatrix, StoreError, TenantDirectory,
    TenantRecord,
};
use edugate_core::{GroupId, PageId};

fn poisoned(store: &str) -> StoreError {
    StoreError::Unavailable(format!("{store} lock poisoned"))
}

/// Write access for administrative updates. A poisoned lock drops the update.
fn write_or_log<'a, T>(lock: &'a RwLock<T>, store: &str) -> Option<RwLockWriteGuard<'a, T>> {
    match lock.write() {
        Ok(guard) => Some(guard),
        Err(_) => {
            tracing::error!(store, "lock poisoned, update dropped");
            None
        }
    }
}

/// Tenant directory keyed by lowercased domain.
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    inner: RwLock<HashMap<String, TenantRecord>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the tenant owning `record.domain`.
    pub fn register(&self, record: TenantRecord) {
        if let Some(mut map) = write_or_log(&self.inner, "tenant directory") {
            map.insert(record.domain.trim().to_lowercase(), record);
        }
    }

    pub fn set_active(&self, domain: &str, active: bool) {
        if let Some(mut map) = write_or_log(&self.inner, "tenant directory") {
            if let Some(record) = map.get_mut(&domain.trim().to_lowercase()) {
                record.active = active;
            }
        }
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned("tenant directory"))?;
        Ok(map.get(&host.trim().to_lowercase()).cloned())
    }
}

/// Page catalog ordered by page id, so scans are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryPageCatalog {
    inner: RwLock<BTreeMap<PageId, Page>>,
}

impl InMemoryPageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, page: Page) {
        if let Some(mut map) = write_or_log(&self.inner, "page catalog") {
            map.insert(page.id, page);
        }
    }

    fn scan<F>(&self, keep: F) -> Result<Vec<Page>, StoreError>
    where
        F: Fn(&Page) -> bool,
    {
        let map = self.inner.read().map_err(|_| poisoned("page catalog"))?;
        Ok(map.values().filter(|p| keep(p)).cloned().collect())
    }
}

#[async_trait]
impl PageCatalog for InMemoryPageCatalog {
    async fn find_exact(&self, requested: &str) -> Result<Option<Page>, StoreError> {
        Ok(self
            .scan(|p| p.matches_exactly(requested))?
            .into_iter()
            .next())
    }

    async fn find_partial(&self, requested: &str) -> Result<Vec<Page>, StoreError> {
        self.scan(|p| p.matches_partially(requested))
    }

    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        self.scan(|_| true)
    }
}

/// Permission matrix holding at most one grant per (group, page).
#[derive(Debug, Default)]
pub struct InMemoryPermissionMatrix {
    inner: RwLock<HashMap<(GroupId, PageId), PermissionGrant>>,
}

impl InMemoryPermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the grant for its (group, page) pair.
    pub fn upsert(&self, grant: PermissionGrant) {
        if let Some(mut map) = write_or_log(&self.inner, "permission matrix") {
            map.insert((grant.group_id, grant.page_id), grant);
        }
    }

    pub fn revoke(&self, group_id: GroupId, page_id: PageId) {
        if let Some(mut map) = write_or_log(&self.inner, "permission matrix") {
            map.remove(&(group_id, page_id));
        }
    }
}

#[async_trait]
impl PermissionMatrix for InMemoryPermissionMatrix {
    async fn grant(
        &self,
        group_id: GroupId,
        page_id: PageId,
    ) -> Result<Option<PermissionGrant>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned("permission matrix"))?;
        Ok(map.get(&(group_id, page_id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugate_auth::PageResolver;
    use edugate_core::TenantId;

    fn page(id: i64, name: &str, path: &str) -> Page {
        Page::new(PageId::new(id), name, path).unwrap()
    }

    #[tokio::test]
    async fn directory_lookup_is_case_insensitive_and_skips_inactive() {
        let directory = InMemoryTenantDirectory::new();
        directory.register(TenantRecord {
            tenant_id: TenantId::new(7),
            domain: "Acme.Example.com".to_string(),
            active: true,
        });

        assert_eq!(
            directory.resolve_tenant("acme.example.COM").await.unwrap(),
            Some(TenantId::new(7))
        );

        directory.set_active("acme.example.com", false);
        assert!(directory.lookup_domain("acme.example.com").await.unwrap().is_some());
        assert_eq!(directory.resolve_tenant("acme.example.com").await.unwrap(), None);
        assert_eq!(directory.resolve_tenant("other.example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn catalog_resolves_exact_then_partial() {
        let catalog = InMemoryPageCatalog::new();
        catalog.insert(page(1, "Students", "students/list"));
        catalog.insert(page(2, "Student Detail", "students/list/detail"));
        let resolver = PageResolver::new(catalog);

        let exact = resolver.resolve("Students/List").await.unwrap().unwrap();
        assert_eq!(exact.id, PageId::new(1));

        let by_name = resolver.resolve("student detail").await.unwrap().unwrap();
        assert_eq!(by_name.id, PageId::new(2));

        let nested = resolver.resolve("students/list/detail/9").await.unwrap().unwrap();
        assert_eq!(nested.id, PageId::new(2));

        let area = resolver.resolve("area/students/list").await.unwrap().unwrap();
        assert_eq!(area.id, PageId::new(1));

        assert_eq!(resolver.resolve("studentslist").await.unwrap(), None);
    }

    fn poison<T>(lock: &RwLock<T>) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = lock.write().unwrap();
            panic!("poisoning lock");
        }));
    }

    #[tokio::test]
    async fn poisoned_directory_fails_closed_without_panicking() {
        let directory = InMemoryTenantDirectory::new();
        poison(&directory.inner);

        directory.register(TenantRecord {
            tenant_id: TenantId::new(7),
            domain: "acme.example.com".to_string(),
            active: true,
        });
        let err = directory.resolve_tenant("acme.example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn matrix_keeps_one_grant_per_pair() {
        let matrix = InMemoryPermissionMatrix::new();
        let mut grant = PermissionGrant {
            group_id: GroupId::new(3),
            page_id: PageId::new(10),
            create: false,
            update: true,
            delete: false,
        };
        matrix.upsert(grant);
        grant.delete = true;
        matrix.upsert(grant);

        let stored = matrix.grant(GroupId::new(3), PageId::new(10)).await.unwrap();
        assert_eq!(stored, Some(grant));

        matrix.revoke(GroupId::new(3), PageId::new(10));
        assert_eq!(matrix.grant(GroupId::new(3), PageId::new(10)).await.unwrap(), None);
    }
}
