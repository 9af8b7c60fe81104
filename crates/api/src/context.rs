use axum::http::HeaderMap;
use axum::http::header::HOST;
use serde::Serialize;

use edugate_auth::{Access, Page};
use edugate_core::{GroupId, TenantId};

/// Confirmed access context for a request that passed the gate.
///
/// Inserted as a request extension; immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateContext {
    tenant_id: TenantId,
    group_id: GroupId,
    page: Page,
}

impl GateContext {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

impl From<Access> for GateContext {
    fn from(access: Access) -> Self {
        Self {
            tenant_id: access.tenant_id,
            group_id: access.group_id,
            page: access.page,
        }
    }
}

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Network identity of the request: normalized host name, if any.
pub fn request_host(headers: &HeaderMap, trust_forwarded: bool) -> Option<String> {
    let raw = if trust_forwarded {
        headers
            .get(FORWARDED_HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
    } else {
        headers.get(HOST).and_then(|v| v.to_str().ok())
    }?;
    normalize_host(raw)
}

/// Lowercase, drop any `:port` and trailing dot. `None` when nothing remains.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // IPv6 literal: keep the brackets, drop the port.
        let end = rest.find(']')?;
        &raw[..end + 2]
    } else {
        raw.split(':').next().unwrap_or(raw)
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() { None } else { Some(host) }
}
