//! `edugate-core`: identifier and error building blocks shared by the gate.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{GroupId, PageId, TenantId};
