use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access-decision core: pure engine, observable stores, per-card controller.
pub mod controller;
pub mod engine;
pub mod guard;
pub mod modal;
pub mod models;
pub mod session;
pub mod store;

// Collaborators the core depends on (identity provider, tier source, navigator).
pub mod identity;
pub mod navigation;
pub mod tier;

// Cross-cutting concerns and the HTTP surface.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
use routes::public;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use controller::{ContentGate, GateRuntime, GateServices};
pub use engine::decide;
pub use error::GateError;
pub use modal::ModalStore;
pub use session::SessionStore;
pub use tier::{FixedTierSource, PostgresTierSource, TierState};

/// ApiDoc
///
/// OpenAPI document for the gate API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::decide_access, handlers::get_session),
    components(
        schemas(
            models::GateRequest, models::GateResponse, models::ViewerSession,
            models::ContentItem, models::Decision, models::Effect, models::Session,
            models::Identity, models::SubscriptionTier, models::Target,
        )
    ),
    tags(
        (name = "summarist-gate", description = "Content access gate API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    /// Subscription tier lookups for signed-in viewers.
    pub tiers: TierState,
    pub config: AppConfig,
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, the observability stack and CORS around the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .with_state(state);

    // Request ids are generated first so the trace span and the response both carry them.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` so every log line of a
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
