use crate::{
    AppState,
    auth::Viewer,
    engine,
    models::{Effect, GateRequest, GateResponse, ViewerSession},
    tier::tier_for_session,
};
use axum::{Json, extract::State, http::StatusCode};

// --- Handlers ---

/// decide_access
///
/// [Public Route] Runs the access-decision engine for the calling viewer and returns
/// the decision together with the effect the client should perform.
///
/// *Advisory*: this endpoint answers "what should the card do"; it does not guard the
/// content itself. Anonymous callers are answered with `require_auth`.
#[utoipa::path(
    post,
    path = "/gate/decide",
    request_body = GateRequest,
    responses((status = 200, description = "Gate decision", body = GateResponse))
)]
pub async fn decide_access(
    Viewer { session }: Viewer,
    State(state): State<AppState>,
    Json(payload): Json<GateRequest>,
) -> Json<GateResponse> {
    let tier = tier_for_session(state.tiers.as_ref(), &session).await;

    let decision = engine::decide(&session, tier, &payload.item, payload.action);
    let effect = Effect::for_decision(&decision, &state.config.upgrade_target());
    let upgrade_notice = engine::shows_upgrade_notice(&session, tier, &payload.item);

    tracing::debug!(
        item = %payload.item.id,
        action = ?payload.action,
        status = ?session.status,
        %tier,
        ?decision,
        "gate decision"
    );

    Json(GateResponse {
        decision,
        effect,
        upgrade_notice,
    })
}

/// get_session
///
/// [Authenticated Route] Returns the caller's session and resolved subscription tier.
/// Anonymous callers receive 401 so the client can open the login modal.
#[utoipa::path(
    get,
    path = "/me/session",
    responses(
        (status = 200, description = "Viewer session", body = ViewerSession),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_session(
    Viewer { session }: Viewer,
    State(state): State<AppState>,
) -> Result<Json<ViewerSession>, StatusCode> {
    if !session.is_authenticated() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let tier = tier_for_session(state.tiers.as_ref(), &session).await;
    Ok(Json(ViewerSession { session, tier }))
}
