use std::{collections::HashMap, sync::Arc, time::SystemTime};

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    routing::post,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use summarist_gate::{
    AppConfig, GateError, SessionStore,
    auth::Claims,
    identity::{
        IdentityProvider, IdentityState, SessionChange, SessionEvent, SupabaseIdentityProvider,
    },
    models::{Session, SessionStatus},
};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "supabase-test-secret";

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    // Nothing listens on the discard port; network calls fail fast.
    config.supabase_url = "http://127.0.0.1:9".to_string();
    config
}

fn token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        email: Some("reader@example.com".to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

const STUB_USER: Uuid = Uuid::from_u128(21);

/// Spawns a stand-in for the Supabase Auth API and returns its base URL.
async fn spawn_stub_auth() -> String {
    async fn token_grant(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        match params.get("grant_type").map(String::as_str) {
            Some("password") | Some("refresh_token") => (
                StatusCode::OK,
                Json(json!({
                    "access_token": token(STUB_USER, 3600),
                    "refresh_token": "stub-refresh",
                    "token_type": "bearer"
                })),
            ),
            _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported_grant_type" }))),
        }
    }

    let router = Router::new()
        .route("/auth/v1/token", post(token_grant))
        // Email confirmation is on: signup creates the user but no session.
        .route(
            "/auth/v1/signup",
            post(|| async { Json(json!({ "id": STUB_USER.to_string() })) }),
        )
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

// --- Tests ---

#[tokio::test]
async fn test_no_token_means_no_session() {
    let provider = SupabaseIdentityProvider::new(&config());
    assert_eq!(provider.current_session().await.unwrap(), None);
}

#[tokio::test]
async fn test_adopted_token_resolves_identity() {
    let provider = SupabaseIdentityProvider::new(&config());
    let mut events = provider.on_session_change();
    let user_id = Uuid::from_u128(11);

    let identity = provider.adopt_token(&token(user_id, 3600), None).unwrap();

    assert_eq!(identity.id, user_id);
    assert_eq!(identity.email.as_deref(), Some("reader@example.com"));
    assert!(identity.expires_at.is_some());
    assert_eq!(events.try_recv().unwrap().event, SessionEvent::SignedIn(identity.clone()));
    assert_eq!(provider.current_session().await.unwrap(), Some(identity));
}

#[tokio::test]
async fn test_replacing_token_for_same_user_is_a_refresh() {
    let provider = SupabaseIdentityProvider::new(&config());
    let user_id = Uuid::from_u128(12);
    provider.adopt_token(&token(user_id, 600), None).unwrap();

    let mut events = provider.on_session_change();
    let refreshed = provider.adopt_token(&token(user_id, 3600), None).unwrap();
    let other = provider
        .adopt_token(&token(Uuid::from_u128(99), 3600), None)
        .unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        SessionChange::new(2, SessionEvent::TokenRefreshed(refreshed))
    );
    assert_eq!(
        events.try_recv().unwrap(),
        SessionChange::new(3, SessionEvent::SignedIn(other))
    );
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let provider = SupabaseIdentityProvider::new(&config());
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: Uuid::from_u128(13),
            iat: 0,
            exp: usize::MAX / 2,
            email: None,
        },
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let err = provider.adopt_token(&forged, None).unwrap_err();
    assert!(matches!(err, GateError::AuthOperationFailed(_)));
    assert_eq!(provider.current_session().await.unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_logout_keeps_session() {
    let provider = Arc::new(SupabaseIdentityProvider::new(&config()));
    provider
        .adopt_token(&token(Uuid::from_u128(14), 3600), None)
        .unwrap();

    let store = SessionStore::new(provider.clone() as IdentityState);
    let resolved = store.resolve().await.unwrap();
    assert_eq!(resolved.status, SessionStatus::Authenticated);

    let err = store.sign_out().await.unwrap_err();
    assert!(matches!(err, GateError::AuthOperationFailed(_)));
    assert_eq!(store.current_session(), resolved);
    assert!(provider.current_session().await.unwrap().is_some());
}

#[tokio::test]
async fn test_sign_out_without_token_is_local() {
    let provider = Arc::new(SupabaseIdentityProvider::new(&config()));
    let store = SessionStore::new(provider as IdentityState);
    store.resolve().await.unwrap();

    store.sign_out().await.unwrap();
    assert_eq!(store.current_session(), Session::anonymous());
}

#[tokio::test]
async fn test_password_sign_in_refresh_and_logout_against_stub() {
    let mut config = config();
    config.supabase_url = spawn_stub_auth().await;
    let provider = Arc::new(SupabaseIdentityProvider::new(&config));

    let store = Arc::new(SessionStore::new(provider.clone() as IdentityState));
    let _listener = store.listen();
    store.resolve().await.unwrap();
    let mut updates = store.subscribe();
    assert_eq!(updates.recv().await, Some(Session::anonymous()));

    let identity = provider
        .sign_in_with_password("reader@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(identity.id, STUB_USER);
    let signed_in = updates.recv().await.unwrap();
    assert_eq!(signed_in.status, SessionStatus::Authenticated);

    let refreshed = provider.refresh_session().await.unwrap();
    assert_eq!(refreshed.id, STUB_USER);

    store.sign_out().await.unwrap();
    assert_eq!(store.current_session(), Session::anonymous());
    assert_eq!(provider.current_session().await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_up_awaiting_confirmation_has_no_session() {
    let mut config = config();
    config.supabase_url = spawn_stub_auth().await;
    let provider = SupabaseIdentityProvider::new(&config);

    let outcome = provider.sign_up("new@example.com", "hunter2").await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(provider.current_session().await.unwrap(), None);
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails() {
    let provider = SupabaseIdentityProvider::new(&config());
    let err = provider.refresh_session().await.unwrap_err();
    assert!(matches!(err, GateError::AuthOperationFailed(_)));
}
