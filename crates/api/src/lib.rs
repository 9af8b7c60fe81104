//! HTTP API: axum integration of the access gate.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
