//! Access gate: one pass/fail decision per protected operation.
//!
//! States per request: `Start -> DomainChecked -> PageResolved -> Decided`.
//! Each step can short-circuit the whole decision, so steps run strictly in
//! sequence. The gate only reads from its collaborators; session mutations are
//! returned as [`SessionEffect`]s inside the [`Verdict`].
//!
//! - Fail-closed: store failures become `Deny(StoreUnavailable)`.
//! - Every deny is written to the `edugate::audit` target.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use edugate_core::{GroupId, TenantId};

use crate::capability::evaluate;
use crate::consistency::{DomainConsistencyChecker, TenantCheck};
use crate::page::{Page, PageResolver};
use crate::principal::{ANONYMOUS, Principal};
use crate::session::{SessionControl, SessionEffect};
use crate::store::{PageCatalog, PermissionMatrix, StoreError, TenantDirectory};

const AUDIT_TARGET: &str = "edugate::audit";
const DIAGNOSTICS_TARGET: &str = "edugate::diagnostics";

/// Characters left unescaped in a return URL query value.
const RETURN_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Static gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Single generic destination for every deny.
    pub denied_path: String,
    /// Query parameter carrying the original URL on `Unauthenticated`.
    pub return_param: String,
    /// Record the confirmed tenant in the session after a consistent check.
    pub persist_confirmed_tenant: bool,
    /// Dump the page catalog at DEBUG when a page fails to resolve.
    pub catalog_diagnostics: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            denied_path: "/access-denied".to_string(),
            return_param: "returnUrl".to_string(),
            persist_confirmed_tenant: true,
            catalog_diagnostics: false,
        }
    }
}

/// What a protected operation declares about itself: the logical page it
/// represents and the capability it needs (`"view"` unless stated).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtectedOperation {
    page: Cow<'static, str>,
    capability: Cow<'static, str>,
}

impl ProtectedOperation {
    pub fn new(page: impl Into<Cow<'static, str>>) -> Self {
        Self {
            page: page.into(),
            capability: Cow::Borrowed("view"),
        }
    }

    pub fn requiring(mut self, capability: impl Into<Cow<'static, str>>) -> Self {
        self.capability = capability.into();
        self
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }
}

/// Per-request inputs read by the gate.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Normalized request host (network identity).
    pub host: Option<&'a str>,
    /// Verified principal, `None` when the caller is not authenticated.
    pub principal: Option<&'a Principal>,
    /// Tenant previously recorded in the connection's session.
    pub recorded_tenant: Option<TenantId>,
    /// Path and query of the original request, used as a return target.
    pub original_url: &'a str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    DomainUnrecognized,
    MissingIdentity,
    TenantMismatch,
    PageUnregistered,
    InsufficientPermission,
    /// A collaborator could not be queried.
    StoreUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::DomainUnrecognized => "domain_unrecognized",
            DenyReason::MissingIdentity => "missing_identity",
            DenyReason::TenantMismatch => "tenant_mismatch",
            DenyReason::PageUnregistered => "page_unregistered",
            DenyReason::InsufficientPermission => "insufficient_permission",
            DenyReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context handed to the protected operation on `Allow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub tenant_id: TenantId,
    pub group_id: GroupId,
    pub page: Page,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    /// Where the user is sent. Never reveals the reason.
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Access),
    Deny(Denial),
}

/// A decision plus the session effects that must be applied before the
/// response leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub effects: Vec<SessionEffect>,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self.decision, Decision::Allow(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match &self.decision {
            Decision::Allow(_) => None,
            Decision::Deny(denial) => Some(denial.reason),
        }
    }

    /// Apply every effect to the current connection. Synchronous, so it cannot
    /// be interrupted half-way by request cancellation.
    pub fn apply(&self, session: &mut (impl SessionControl + ?Sized)) {
        for effect in &self.effects {
            effect.apply(session);
        }
    }
}

/// Fields accumulated for the audit entry as evaluation progresses.
struct AuditTrail<'a> {
    principal: &'a str,
    group_id: Option<GroupId>,
    page: Cow<'a, str>,
    capability: &'a str,
}

impl<'a> AuditTrail<'a> {
    /// Starts from the requested page and whatever group the principal claims.
    fn new(request: &AccessRequest<'a>, operation: &'a ProtectedOperation) -> Self {
        Self {
            principal: request.principal.map_or(ANONYMOUS, Principal::display_name),
            group_id: request.principal.and_then(Principal::group),
            page: Cow::Borrowed(operation.page()),
            capability: operation.capability(),
        }
    }
}

/// Orchestrates the consistency check, page resolution and capability
/// evaluation over injected collaborators.
#[derive(Debug, Clone)]
pub struct AccessGate<D, C, M> {
    checker: DomainConsistencyChecker<D>,
    resolver: PageResolver<C>,
    matrix: M,
    settings: GateSettings,
}

impl<D, C, M> AccessGate<D, C, M>
where
    D: TenantDirectory,
    C: PageCatalog,
    M: PermissionMatrix,
{
    pub fn new(directory: D, catalog: C, matrix: M, settings: GateSettings) -> Self {
        Self {
            checker: DomainConsistencyChecker::new(directory),
            resolver: PageResolver::new(catalog),
            matrix,
            settings,
        }
    }

    /// Decide one request. Never fails: any error is a deny.
    #[tracing::instrument(
        name = "access_gate",
        skip_all,
        fields(page = %operation.page(), capability = %operation.capability())
    )]
    pub async fn check<'a>(
        &self,
        request: &AccessRequest<'a>,
        operation: &'a ProtectedOperation,
    ) -> Verdict {
        let mut trail = AuditTrail::new(request, operation);

        match self.evaluate(request, operation, &mut trail).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::error!(
                    target: AUDIT_TARGET,
                    error = %err,
                    "store failure during access check"
                );
                self.deny(&trail, DenyReason::StoreUnavailable, request, Vec::new())
            }
        }
    }

    async fn evaluate<'a>(
        &self,
        request: &AccessRequest<'a>,
        operation: &'a ProtectedOperation,
        trail: &mut AuditTrail<'a>,
    ) -> Result<Verdict, StoreError> {
        let Some(principal) = request.principal else {
            return Ok(self.deny(trail, DenyReason::Unauthenticated, request, Vec::new()));
        };

        let check = self
            .checker
            .check(request.host, principal, request.recorded_tenant)
            .await?;
        let effects = check.effects(self.settings.persist_confirmed_tenant);
        let tenant_id = match check {
            TenantCheck::Confirmed(tenant_id) => tenant_id,
            TenantCheck::DomainUnrecognized => {
                return Ok(self.deny(trail, DenyReason::DomainUnrecognized, request, effects));
            }
            TenantCheck::MissingIdentity => {
                return Ok(self.deny(trail, DenyReason::MissingIdentity, request, effects));
            }
            TenantCheck::Mismatch {
                claimed,
                recorded,
                domain,
            } => {
                tracing::error!(
                    target: AUDIT_TARGET,
                    principal = trail.principal,
                    host = request.host.unwrap_or_default(),
                    %claimed,
                    %recorded,
                    %domain,
                    "tenant mismatch, forcing sign-out"
                );
                return Ok(self.deny(trail, DenyReason::TenantMismatch, request, effects));
            }
        };

        let Some(group_id) = principal.group() else {
            return Ok(self.deny(trail, DenyReason::MissingIdentity, request, effects));
        };

        let Some(page) = self.resolver.resolve(operation.page()).await? else {
            self.dump_catalog(operation.page()).await;
            return Ok(self.deny(trail, DenyReason::PageUnregistered, request, effects));
        };
        trail.page = Cow::Owned(page.path.clone());

        let grant = self.matrix.grant(group_id, page.id).await?;
        if !evaluate(grant.as_ref(), operation.capability()) {
            return Ok(self.deny(trail, DenyReason::InsufficientPermission, request, effects));
        }

        tracing::debug!(
            principal = trail.principal,
            %tenant_id,
            %group_id,
            page = %page.path,
            "access allowed"
        );
        Ok(Verdict {
            decision: Decision::Allow(Access {
                tenant_id,
                group_id,
                page,
            }),
            effects,
        })
    }

    fn deny(
        &self,
        trail: &AuditTrail<'_>,
        reason: DenyReason,
        request: &AccessRequest<'_>,
        effects: Vec<SessionEffect>,
    ) -> Verdict {
        let group_id = trail.group_id.map(GroupId::get);
        tracing::warn!(
            target: AUDIT_TARGET,
            principal = trail.principal,
            group_id,
            page = %trail.page,
            capability = trail.capability,
            reason = reason.as_str(),
            "access denied"
        );

        Verdict {
            decision: Decision::Deny(Denial {
                reason,
                redirect: self.redirect_for(reason, request.original_url),
            }),
            effects,
        }
    }

    fn redirect_for(&self, reason: DenyReason, original_url: &str) -> String {
        let denied = &self.settings.denied_path;
        if reason != DenyReason::Unauthenticated || original_url.is_empty() {
            return denied.clone();
        }
        format!(
            "{denied}?{}={}",
            self.settings.return_param,
            utf8_percent_encode(original_url, RETURN_URL)
        )
    }

    async fn dump_catalog(&self, requested: &str) {
        if !self.settings.catalog_diagnostics {
            return;
        }
        match self.resolver.catalog().list_pages().await {
            Ok(pages) => {
                let known: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
                tracing::debug!(
                    target: DIAGNOSTICS_TARGET,
                    requested,
                    ?known,
                    "page not in catalog"
                );
            }
            Err(err) => {
                tracing::debug!(
                    target: DIAGNOSTICS_TARGET,
                    requested,
                    error = %err,
                    "catalog listing failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCatalog, FakeDirectory, FakeMatrix, RecordingSession};
    use edugate_core::PageId;
    use std::time::Duration;

    type TestGate = AccessGate<FakeDirectory, FakeCatalog, FakeMatrix>;

    fn pages() -> Vec<Page> {
        vec![
            Page::new(PageId::new(10), "Billing Edit", "billing/edit").unwrap(),
            Page::new(PageId::new(11), "Billing Delete", "billing/delete").unwrap(),
            Page::new(PageId::new(12), "Students", "students/list").unwrap(),
        ]
    }

    fn directory() -> FakeDirectory {
        FakeDirectory::new()
            .with("acme.example.com", 7, true)
            .with("other.example.com", 9, true)
    }

    fn matrix() -> FakeMatrix {
        FakeMatrix::new()
            .with(3, 10, false, true, false)
            .with(3, 12, true, false, false)
    }

    fn gate() -> TestGate {
        AccessGate::new(directory(), FakeCatalog::new(pages()), matrix(), GateSettings::default())
    }

    fn alice() -> Principal {
        Principal::new("alice").with_tenant_claim(7).with_group_claim(3)
    }

    fn request<'a>(host: &'a str, principal: Option<&'a Principal>) -> AccessRequest<'a> {
        AccessRequest {
            host: Some(host),
            principal,
            recorded_tenant: Some(TenantId::new(7)),
            original_url: "/billing/edit/5?tab=2",
        }
    }

    #[tokio::test]
    async fn consistent_principal_with_grant_is_allowed() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;

        let Decision::Allow(access) = &verdict.decision else {
            panic!("expected allow, got {verdict:?}");
        };
        assert_eq!(access.tenant_id, TenantId::new(7));
        assert_eq!(access.group_id, GroupId::new(3));
        assert_eq!(access.page.id, PageId::new(10));
        assert_eq!(verdict.effects, vec![SessionEffect::ConfirmTenant(TenantId::new(7))]);
    }

    #[tokio::test]
    async fn replay_on_other_tenant_host_clears_session() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let verdict = gate().check(&request("other.example.com", Some(&principal)), &op).await;

        assert_eq!(verdict.deny_reason(), Some(DenyReason::TenantMismatch));
        let mut session = RecordingSession {
            confirmed: Some(TenantId::new(7)),
            ..Default::default()
        };
        verdict.apply(&mut session);
        assert!(session.cleared);
        assert!(session.signed_out);
        assert_eq!(session.confirmed, None);
    }

    #[tokio::test]
    async fn missing_grant_row_is_insufficient_permission() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/delete").requiring("delete");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::InsufficientPermission));
    }

    #[tokio::test]
    async fn capability_defaults_to_view() {
        let principal = alice();
        let op = ProtectedOperation::new("students/list/42");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;
        assert!(verdict.is_allowed());
    }

    #[tokio::test]
    async fn anonymous_callers_get_a_return_url() {
        let op = ProtectedOperation::new("billing/edit");
        let verdict = gate().check(&request("acme.example.com", None), &op).await;

        let Decision::Deny(denial) = verdict.decision else {
            panic!("expected deny");
        };
        assert_eq!(denial.reason, DenyReason::Unauthenticated);
        assert_eq!(
            denial.redirect,
            "/access-denied?returnUrl=%2Fbilling%2Fedit%2F5%3Ftab%3D2"
        );
        assert!(verdict.effects.is_empty());
    }

    #[tokio::test]
    async fn other_denials_redirect_without_return_url() {
        let principal = alice();
        let op = ProtectedOperation::new("nowhere/at/all");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;

        let Decision::Deny(denial) = verdict.decision else {
            panic!("expected deny");
        };
        assert_eq!(denial.reason, DenyReason::PageUnregistered);
        assert_eq!(denial.redirect, "/access-denied");
    }

    #[tokio::test]
    async fn unknown_host_denies_regardless_of_principal() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let verdict = gate().check(&request("evil.example.net", Some(&principal)), &op).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::DomainUnrecognized));
        assert!(verdict.effects.is_empty());
    }

    #[tokio::test]
    async fn missing_group_claim_is_missing_identity() {
        let principal = Principal::new("dave").with_tenant_claim(7).with_group_claim("admins");
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::MissingIdentity));
    }

    #[tokio::test]
    async fn unknown_capability_is_denied() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("approve");
        let verdict = gate().check(&request("acme.example.com", Some(&principal)), &op).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::InsufficientPermission));
    }

    #[tokio::test]
    async fn store_failures_fail_closed() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");

        let settings = GateSettings::default;
        let catalog = || FakeCatalog::new(pages());
        let gates: Vec<TestGate> = vec![
            AccessGate::new(FakeDirectory::failing(), catalog(), matrix(), settings()),
            AccessGate::new(directory(), FakeCatalog::failing(), matrix(), settings()),
            AccessGate::new(directory(), catalog(), FakeMatrix::failing(), settings()),
        ];
        for gate in gates {
            let verdict = gate.check(&request("acme.example.com", Some(&principal)), &op).await;
            assert_eq!(verdict.deny_reason(), Some(DenyReason::StoreUnavailable));
            assert!(verdict.effects.is_empty());
        }
    }

    #[tokio::test]
    async fn repeated_checks_are_idempotent() {
        let gate = gate();
        let principal = alice();
        for op in [
            ProtectedOperation::new("billing/edit").requiring("update"),
            ProtectedOperation::new("billing/delete").requiring("delete"),
        ] {
            let first = gate.check(&request("acme.example.com", Some(&principal)), &op).await;
            let second = gate.check(&request("acme.example.com", Some(&principal)), &op).await;
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn persisting_the_confirmed_tenant_can_be_disabled() {
        let settings = GateSettings {
            persist_confirmed_tenant: false,
            ..GateSettings::default()
        };
        let gate = AccessGate::new(directory(), FakeCatalog::new(pages()), matrix(), settings);
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let verdict = gate.check(&request("acme.example.com", Some(&principal)), &op).await;
        assert!(verdict.is_allowed());
        assert!(verdict.effects.is_empty());
    }

    #[test]
    fn audit_trail_knows_the_claimed_group_before_the_tenant_check() {
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let req = request("other.example.com", Some(&principal));

        let trail = AuditTrail::new(&req, &op);
        assert_eq!(trail.principal, "alice");
        assert_eq!(trail.group_id, Some(GroupId::new(3)));

        let anonymous = request("acme.example.com", None);
        let trail = AuditTrail::new(&anonymous, &op);
        assert_eq!(trail.principal, ANONYMOUS);
        assert_eq!(trail.group_id, None);
    }

    #[tokio::test]
    async fn catalog_dump_failure_does_not_change_the_denial() {
        let settings = GateSettings {
            catalog_diagnostics: true,
            ..GateSettings::default()
        };
        let catalog = FakeCatalog::new(pages()).without_listing();
        let gate = AccessGate::new(directory(), catalog, matrix(), settings);
        let principal = alice();
        let op = ProtectedOperation::new("timetable/print");

        let verdict = gate.check(&request("acme.example.com", Some(&principal)), &op).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::PageUnregistered));
        assert!(verdict.effects.contains(&SessionEffect::ConfirmTenant(TenantId::new(7))));
    }

    #[tokio::test]
    async fn cancelled_checks_produce_no_decision() {
        let gate = AccessGate::new(
            FakeDirectory::hanging(),
            FakeCatalog::new(pages()),
            matrix(),
            GateSettings::default(),
        );
        let principal = alice();
        let op = ProtectedOperation::new("billing/edit").requiring("update");
        let req = request("acme.example.com", Some(&principal));

        let outcome = tokio::time::timeout(Duration::from_millis(20), gate.check(&req, &op)).await;
        assert!(outcome.is_err());
    }
}
