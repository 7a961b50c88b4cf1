use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints consumed by the presentation layer's content cards and session widgets.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /gate/decide
        // Evaluates one card interaction (Read / Listen) for the calling viewer.
        .route("/gate/decide", post(handlers::decide_access))
        // GET /me/session
        // The caller's session and subscription tier; 401 when anonymous.
        .route("/me/session", get(handlers::get_session))
}
