use serde::{Deserialize, Serialize};

use edugate_core::{GroupId, TenantId};

/// Display name used in audit entries when no principal is known.
pub const ANONYMOUS: &str = "Anonymous";

/// A claim value exactly as supplied by the authentication layer.
///
/// Claims are kept raw and parsed on demand so that a malformed value can be
/// told apart from a missing one only where it matters (it never grants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimValue(String);

impl ClaimValue {
    /// Convert a JSON claim. Numbers and strings keep their text; anything else
    /// keeps its JSON rendering and will fail to parse as an identifier.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self(s.clone()),
            other => Self(other.to_string()),
        }
    }

    fn parse<T: core::str::FromStr>(&self) -> Option<T> {
        self.0.parse().ok()
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// The authenticated caller for the current request.
///
/// The gate never issues or verifies credentials; it only reads these claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    display_name: Option<String>,
    tenant_claim: Option<ClaimValue>,
    group_claim: Option<ClaimValue>,
}

impl Principal {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..Default::default()
        }
    }

    pub fn with_tenant_claim(mut self, value: impl Into<ClaimValue>) -> Self {
        self.tenant_claim = Some(value.into());
        self
    }

    pub fn with_group_claim(mut self, value: impl Into<ClaimValue>) -> Self {
        self.group_claim = Some(value.into());
        self
    }

    /// Name for audit purposes; never empty.
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => ANONYMOUS,
        }
    }

    /// Claimed tenant, or `None` when the claim is missing or unparseable.
    pub fn claimed_tenant(&self) -> Option<TenantId> {
        self.tenant_claim.as_ref()?.parse()
    }

    /// Claimed group, or `None` when the claim is missing or unparseable.
    pub fn group(&self) -> Option<GroupId> {
        self.group_claim.as_ref()?.parse()
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
