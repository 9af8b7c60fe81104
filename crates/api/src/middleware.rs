//! Gate middleware: runs the access gate before a protected handler.
//!
//! The protected route declares its logical page and required capability via
//! [`GateState::require_page`]. Principal claims come from the authentication layer's
//! signed token (bearer header or auth cookie); the recorded tenant comes from
//! the server-side session named by the session cookie.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use edugate_auth::{
    AccessGate, AccessRequest, Decision, PageCatalog, PermissionMatrix, Principal,
    ProtectedOperation, SessionControl, TenantDirectory, TokenClaims, validate_claims,
};
use edugate_core::TenantId;
use edugate_infra::{SessionId, SessionStore};

use crate::config::CookieNames;
use crate::context::{GateContext, request_host};

/// Gate over type-erased collaborators, shared by every protected route.
pub type SharedGate =
    AccessGate<Arc<dyn TenantDirectory>, Arc<dyn PageCatalog>, Arc<dyn PermissionMatrix>>;

/// Verifies principal tokens issued by the authentication layer.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<Principal>;
}

/// HS256 token verification with a shared secret.
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str) -> Option<Principal> {
        let data = match jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting principal token");
                return None;
            }
        };
        if let Err(e) = validate_claims(&data.claims, Utc::now()) {
            tracing::debug!(error = %e, "rejecting principal token");
            return None;
        }
        Some(data.claims.to_principal())
    }
}

#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<SharedGate>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<dyn TokenVerifier>,
    pub cookies: Arc<CookieNames>,
    pub trust_forwarded_host: bool,
}

impl GateState {
    /// Guard for a route representing `page` and needing `capability`.
    pub fn require_page(
        &self,
        page: impl Into<Cow<'static, str>>,
        capability: impl Into<Cow<'static, str>>,
    ) -> Guard {
        let operation = ProtectedOperation::new(page).requiring(capability);
        Guard {
            state: self.clone(),
            operation: Arc::new(operation),
        }
    }
}

#[derive(Clone)]
pub struct Guard {
    state: GateState,
    operation: Arc<ProtectedOperation>,
}

/// Middleware entrypoint, used with `axum::middleware::from_fn_with_state`.
pub async fn enforce(
    State(guard): State<Guard>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let state = &guard.state;

    let principal = extract_token(req.headers(), &jar, &state.cookies.auth)
        .and_then(|token| state.tokens.verify(token));
    let session_id = jar
        .get(&state.cookies.session)
        .and_then(|c| c.value().parse::<SessionId>().ok());
    let recorded_tenant = session_id
        .and_then(|id| state.sessions.get(id))
        .and_then(|record| record.recorded_tenant);
    let host = request_host(req.headers(), state.trust_forwarded_host);
    let original_url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();

    let verdict = state
        .gate
        .check(
            &AccessRequest {
                host: host.as_deref(),
                principal: principal.as_ref(),
                recorded_tenant,
                original_url: &original_url,
            },
            &guard.operation,
        )
        .await;

    let mut connection = ConnectionSession {
        sessions: state.sessions.as_ref(),
        session_id,
        cookies: &state.cookies,
        jar,
    };
    verdict.apply(&mut connection);

    match verdict.decision {
        Decision::Allow(access) => {
            req.extensions_mut().insert(GateContext::from(access));
            next.run(req).await
        }
        Decision::Deny(denial) => (connection.jar, Redirect::to(&denial.redirect)).into_response(),
    }
}

/// Session effects bound to the current connection only.
struct ConnectionSession<'a> {
    sessions: &'a dyn SessionStore,
    session_id: Option<SessionId>,
    cookies: &'a CookieNames,
    jar: CookieJar,
}

impl ConnectionSession<'_> {
    fn expire_cookie(&mut self, name: &str) {
        let mut cookie = Cookie::new(name.to_string(), "");
        cookie.set_path("/");
        self.jar = self.jar.clone().remove(cookie);
    }
}

impl SessionControl for ConnectionSession<'_> {
    fn confirm_tenant(&mut self, tenant_id: TenantId) {
        if let Some(id) = self.session_id {
            self.sessions.confirm_tenant(id, tenant_id);
        }
    }

    fn clear(&mut self) {
        if let Some(id) = self.session_id.take() {
            self.sessions.remove(id);
        }
        let name = self.cookies.session.clone();
        self.expire_cookie(&name);
    }

    fn sign_out(&mut self) {
        let name = self.cookies.auth.clone();
        self.expire_cookie(&name);
    }
}

fn extract_token<'a>(headers: &'a HeaderMap, jar: &'a CookieJar, cookie: &str) -> Option<&'a str> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        jar.get(cookie)
            .map(|c| c.value().trim())
            .filter(|t| !t.is_empty())
    })
}
