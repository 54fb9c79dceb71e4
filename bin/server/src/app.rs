//! HTTP router.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};

/// Builds the application router.
///
/// Every route, including the fallback, runs behind the session
/// middleware, so handlers always find a `RequestIdentity`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login-callback", get(auth::login_callback))
        .route("/logout", get(auth::logout))
        .route("/me", get(auth::me))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identify_request,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
