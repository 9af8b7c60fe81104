use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::{ClaimValue, Principal};

/// Principal token claims (transport-agnostic).
///
/// This is the minimal set of claims the gate expects once a token has been
/// decoded and its signature checked by whatever authentication layer is in
/// use. Tenant and group are kept as raw JSON so malformed values survive
/// decoding and are rejected by the gate instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Display name shown in audit entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tenant ("root") the principal claims to act within.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<serde_json::Value>,

    /// Permission group of the principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<serde_json::Value>,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiration, seconds since the epoch.
    pub exp: i64,
}

impl TokenClaims {
    pub fn to_principal(&self) -> Principal {
        let name = self.name.clone().unwrap_or_else(|| self.sub.clone());
        let mut principal = Principal::new(name);
        if let Some(tenant) = &self.tenant_id {
            principal = principal.with_tenant_claim(ClaimValue::from_json(tenant));
        }
        if let Some(group) = &self.group_id {
            principal = principal.with_group_claim(ClaimValue::from_json(group));
        }
        principal
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window.
///
/// Note: this validates the *claims* only. Signature verification / decoding is
/// outside this crate.
pub fn validate_claims(
    claims: &TokenClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
