//! Postgres-backed collaborator store.
//!
//! Reads the `roots`, `pages` and `group_page_permissions` tables (see
//! `migrations/0001_access_gate.sql`). The gate never writes through this store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | PoolTimedOut / PoolClosed / Io / Tls | `Unavailable` |
//! | Database / other | `Query` |
//! | Column decode failure | `Decode` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use edugate_auth::{
    Page, PageCatalog, PermissionGrant, PermissionMatrix, StoreError, TenantDirectory,
    TenantRecord,
};
use edugate_core::{GroupId, PageId, TenantId};

/// One pool serving the tenant directory, page catalog and permission matrix.
#[derive(Debug, Clone)]
pub struct PostgresAccessStore {
    pool: Arc<PgPool>,
}

impl PostgresAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {operation}: {e}")),
        sqlx::Error::Database(db_err) => {
            StoreError::Query(format!("database error in {operation}: {}", db_err.message()))
        }
        other => StoreError::Query(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode<T>(operation: &str, result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
    result.map_err(|e| StoreError::Decode(format!("{operation}: {e}")))
}

fn page_from_row(row: &PgRow) -> Result<Page, StoreError> {
    let id: i64 = decode("page.id", row.try_get("id"))?;
    let name: String = decode("page.name", row.try_get("name"))?;
    let path: String = decode("page.path", row.try_get("path"))?;
    Page::new(PageId::new(id), name, path).map_err(|e| StoreError::Decode(e.to_string()))
}

const PAGE_COLUMNS: &str = "id, name, path";

#[async_trait]
impl TenantDirectory for PostgresAccessStore {
    #[instrument(skip(self), err)]
    async fn lookup_domain(&self, host: &str) -> Result<Option<TenantRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, domain, is_active
            FROM roots
            WHERE LOWER(domain) = LOWER($1)
            LIMIT 1
            "#,
        )
        .bind(host.trim())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("lookup_domain", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(TenantRecord {
            tenant_id: TenantId::new(decode("roots.id", row.try_get("id"))?),
            domain: decode("roots.domain", row.try_get("domain"))?,
            active: decode("roots.is_active", row.try_get("is_active"))?,
        }))
    }
}

#[async_trait]
impl PageCatalog for PostgresAccessStore {
    #[instrument(skip(self), err)]
    async fn find_exact(&self, requested: &str) -> Result<Option<Page>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PAGE_COLUMNS}
            FROM pages
            WHERE LOWER(TRIM(BOTH '/' FROM path)) = LOWER($1)
               OR LOWER(TRIM(name)) = LOWER($1)
            ORDER BY id
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(requested)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_exact", e))?;

        row.as_ref().map(page_from_row).transpose()
    }

    /// `LIKE` treats `_`/`%` in stored paths as wildcards, so this may return
    /// extra rows; the resolver filters candidates again.
    #[instrument(skip(self), err)]
    async fn find_partial(&self, requested: &str) -> Result<Vec<Page>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PAGE_COLUMNS}
            FROM pages
            WHERE TRIM(BOTH '/' FROM path) <> ''
              AND (LOWER($1) LIKE (LOWER(TRIM(BOTH '/' FROM path)) || '/%')
                OR LOWER($1) LIKE ('%/' || LOWER(TRIM(BOTH '/' FROM path))))
            ORDER BY id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(requested)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_partial", e))?;

        rows.iter().map(page_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_pages", e))?;

        rows.iter().map(page_from_row).collect()
    }
}

#[async_trait]
impl PermissionMatrix for PostgresAccessStore {
    #[instrument(skip(self), err)]
    async fn grant(
        &self,
        group_id: GroupId,
        page_id: PageId,
    ) -> Result<Option<PermissionGrant>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT can_create, can_update, can_delete
            FROM group_page_permissions
            WHERE group_id = $1 AND page_id = $2
            "#,
        )
        .bind(group_id.get())
        .bind(page_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("grant", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(PermissionGrant {
            group_id,
            page_id,
            create: decode("grant.can_create", row.try_get("can_create"))?,
            update: decode("grant.can_update", row.try_get("can_update"))?,
            delete: decode("grant.can_delete", row.try_get("can_delete"))?,
        }))
    }
}
