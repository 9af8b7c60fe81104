//! Infrastructure layer: collaborator stores and session persistence.

pub mod access_store;
pub mod session;

pub use access_store::{
    InMemoryPageCatalog, InMemoryPermissionMatrix, InMemoryTenantDirectory, PostgresAccessStore,
};
pub use session::{InMemorySessionStore, SessionId, SessionRecord, SessionStore};
