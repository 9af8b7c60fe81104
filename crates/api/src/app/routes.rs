use axum::{
    Extension, Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{MethodRouter, delete, get, post, put},
};

use crate::context::GateContext;
use crate::middleware::{self, GateState};

/// Screens of the education center, each mapped onto four catalog pages:
/// `<screen>/list` (view, insert), `<screen>/edit` (update), `<screen>/delete`.
pub const SCREENS: &[&str] = &["branches", "halls", "subjects", "schedules", "billing"];

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the confirmed access context; stands in for the screen's handler.
pub async fn access_context(Extension(ctx): Extension<GateContext>) -> Json<GateContext> {
    tracing::debug!(
        tenant_id = %ctx.tenant_id(),
        group_id = %ctx.group_id(),
        page = %ctx.page().path,
        "serving gated screen"
    );
    Json(ctx)
}

fn gated(
    state: &GateState,
    page: String,
    capability: &'static str,
    route: MethodRouter,
) -> MethodRouter {
    let guard = state.require_page(page, capability);
    route.route_layer(from_fn_with_state(guard, middleware::enforce))
}

/// Router for all gated endpoints.
pub fn router(state: &GateState) -> Router {
    SCREENS.iter().fold(Router::new(), |router, screen| {
        let collection = gated(state, format!("{screen}/list"), "view", get(access_context))
            .merge(gated(state, format!("{screen}/list"), "insert", post(access_context)));
        let member = gated(state, format!("{screen}/edit"), "update", put(access_context))
            .merge(gated(state, format!("{screen}/delete"), "delete", delete(access_context)));

        router
            .route(&format!("/{screen}"), collection)
            .route(&format!("/{screen}/:id"), member)
    })
}
