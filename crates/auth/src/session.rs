//! Session side effects requested by the gate.
//!
//! The gate never mutates session state while it is still awaiting store
//! reads. It returns effects as data; the caller applies them in one
//! synchronous step once the decision is final, so a cancelled evaluation
//! leaves the connection untouched.

use serde::Serialize;

use edugate_core::TenantId;

/// A mutation of the current connection's session/authentication state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "tenant_id")]
pub enum SessionEffect {
    /// Record the triple-confirmed tenant for downstream handlers.
    ConfirmTenant(TenantId),
    /// Expire the server-side session.
    ClearSession,
    /// Invalidate the authentication cookie/token of this connection.
    SignOut,
}

/// Per-connection session handle supplied by the hosting request pipeline.
///
/// Implementations must be idempotent: clearing an already cleared session or
/// signing out twice is a no-op.
pub trait SessionControl {
    fn confirm_tenant(&mut self, tenant_id: TenantId);
    fn clear(&mut self);
    fn sign_out(&mut self);
}

impl SessionEffect {
    pub fn apply(&self, session: &mut (impl SessionControl + ?Sized)) {
        match *self {
            SessionEffect::ConfirmTenant(tenant_id) => session.confirm_tenant(tenant_id),
            SessionEffect::ClearSession => session.clear(),
            SessionEffect::SignOut => session.sign_out(),
        }
    }
}
