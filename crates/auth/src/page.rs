//! Page catalog records and requested-page resolution.
//!
//! Resolution is two-phase: an exact match on canonical path or name must
//! fully fail before the partial (path-segment prefix/suffix) fallback runs, so
//! a specific page is never shadowed by a coarser one.

use serde::{Deserialize, Serialize};

use edugate_core::{DomainError, DomainResult, PageId};

use crate::store::{PageCatalog, StoreError};

/// A catalog-registered application page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
    pub path: String,
}

impl Page {
    /// Build a page record; the canonical path must not be blank.
    pub fn new(id: PageId, name: impl Into<String>, path: impl Into<String>) -> DomainResult<Self> {
        let path = path.into();
        if normalize(&path).is_empty() {
            return Err(DomainError::validation(format!("page {id} has an empty path")));
        }
        Ok(Self {
            id,
            name: name.into(),
            path,
        })
    }

    /// Canonical path, lowercased and without surrounding slashes.
    pub fn match_key(&self) -> String {
        normalize(&self.path).to_lowercase()
    }

    /// Exact, case-insensitive match on canonical path or name.
    pub fn matches_exactly(&self, requested: &str) -> bool {
        let requested = normalize(requested).to_lowercase();
        if requested.is_empty() {
            return false;
        }
        self.match_key() == requested || self.name.trim().to_lowercase() == requested
    }

    /// The canonical path is a whole-segment prefix or suffix of `requested`.
    pub fn matches_partially(&self, requested: &str) -> bool {
        let key = self.match_key();
        let requested = normalize(requested).to_lowercase();
        if key.is_empty() || requested.is_empty() {
            return false;
        }
        requested.starts_with(&format!("{key}/")) || requested.ends_with(&format!("/{key}"))
    }
}

/// Trim whitespace and surrounding `/` from a page identifier.
pub fn normalize(requested: &str) -> &str {
    requested.trim().trim_matches('/').trim()
}

/// Pick one page among partial candidates: longest canonical path, then lowest id.
pub fn pick_partial<I>(candidates: I) -> Option<Page>
where
    I: IntoIterator<Item = Page>,
{
    candidates.into_iter().min_by(|a, b| {
        b.match_key()
            .len()
            .cmp(&a.match_key().len())
            .then(a.id.cmp(&b.id))
    })
}

/// Resolves a declared page identifier to a catalog entry.
#[derive(Debug, Clone)]
pub struct PageResolver<C> {
    catalog: C,
}

impl<C: PageCatalog> PageResolver<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub async fn resolve(&self, requested: &str) -> Result<Option<Page>, StoreError> {
        let requested = normalize(requested);
        if requested.is_empty() {
            return Ok(None);
        }

        if let Some(page) = self.catalog.find_exact(requested).await? {
            if page.matches_exactly(requested) {
                return Ok(Some(page));
            }
        }

        let candidates = self.catalog.find_partial(requested).await?;
        Ok(pick_partial(
            candidates
                .into_iter()
                .filter(|page| page.matches_partially(requested)),
        ))
    }
}
