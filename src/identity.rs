use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use serde::Deserialize;
use std::sync::{
    Arc, Mutex, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;

use crate::{auth::decode_claims, config::AppConfig, error::GateError, models::Identity};

const EVENT_CAPACITY: usize = 16;

/// SessionEvent
///
/// Transitions reported by the identity provider. No event leads back to `Unresolved`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    SignedOut,
    TokenRefreshed(Identity),
}

/// SessionChange
///
/// A `SessionEvent` stamped with the provider's emission order. Sequence numbers start at
/// 1 and strictly increase per provider, so a consumer can tell a late delivery from a
/// newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub seq: u64,
    pub event: SessionEvent,
}

impl SessionChange {
    pub fn new(seq: u64, event: SessionEvent) -> Self {
        Self { seq, event }
    }
}

/// SessionEvents
///
/// The broadcast side of a provider. Stamping and sending happen under one lock, so
/// receivers always see sequence numbers in increasing order.
pub struct SessionEvents {
    sender: broadcast::Sender<SessionChange>,
    last_seq: Mutex<u64>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sender,
            last_seq: Mutex::new(0),
        }
    }
}

impl SessionEvents {
    pub fn emit(&self, event: SessionEvent) -> SessionChange {
        let mut last_seq = self.last_seq.lock().unwrap_or_else(PoisonError::into_inner);
        *last_seq += 1;
        let change = SessionChange::new(*last_seq, event);
        // No receivers is fine: nobody is listening yet.
        let _ = self.sender.send(change.clone());
        change
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.sender.subscribe()
    }
}

/// IdentityProvider Trait
///
/// The contract the session store depends on. Any backend (Supabase, a test double, a
/// different vendor) plugs in here.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the session the provider currently holds, if any.
    async fn current_session(&self) -> Result<Option<Identity>, GateError>;

    /// Registers for session transitions. Events emitted before this call are not replayed.
    fn on_session_change(&self) -> broadcast::Receiver<SessionChange>;

    /// Terminates the provider-side session and returns the `SignedOut` change it emitted.
    async fn sign_out(&self) -> Result<SessionChange, GateError>;
}

/// IdentityState
///
/// The shared handle to the provider.
pub type IdentityState = Arc<dyn IdentityProvider>;

// --- Supabase ---

/// TokenResponse
///
/// Minimal struct to deserialize a session from the Supabase /auth/v1/token and
/// /auth/v1/signup endpoints. Signup returns no token when email confirmation is on.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// SupabaseIdentityProvider
///
/// Talks to the Supabase Auth (GoTrue) REST API. Access tokens are validated locally with
/// the project's JWT secret, so `current_session` needs no network round-trip.
pub struct SupabaseIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    jwt_secret: String,
    tokens: RwLock<Tokens>,
    events: SessionEvents,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
            tokens: RwLock::new(Tokens::default()),
            events: SessionEvents::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    fn clear_tokens(&self) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Tokens::default();
    }

    /// adopt_token
    ///
    /// Installs an access token (e.g. restored from client storage) as the current session.
    /// Emits `TokenRefreshed` when it replaces a token for the same user, `SignedIn` otherwise.
    pub fn adopt_token(
        &self,
        access_token: &str,
        refresh_token: Option<String>,
    ) -> Result<Identity, GateError> {
        let identity = decode_claims(access_token, &self.jwt_secret)
            .map_err(|e| GateError::AuthOperationFailed(format!("invalid access token: {e}")))?
            .identity();

        let previous = self
            .access_token()
            .and_then(|token| decode_claims(&token, &self.jwt_secret).ok())
            .map(|claims| claims.sub);

        {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            tokens.access = Some(access_token.to_string());
            if refresh_token.is_some() {
                tokens.refresh = refresh_token;
            }
        }

        let event = if previous == Some(identity.id) {
            SessionEvent::TokenRefreshed(identity.clone())
        } else {
            SessionEvent::SignedIn(identity.clone())
        };
        self.events.emit(event);

        Ok(identity)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Identity, GateError> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let session: TokenResponse = response.json().await?;
        let access_token = session.access_token.ok_or_else(|| {
            GateError::AuthOperationFailed("token response carried no access token".to_string())
        })?;

        self.adopt_token(&access_token, session.refresh_token)
    }

    /// Password sign-in through the login modal.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, GateError> {
        let identity = self
            .token_grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        tracing::info!(user_id = %identity.id, "signed in");
        Ok(identity)
    }

    /// sign_up
    ///
    /// Registration through the signup modal. Returns `None` when the project requires
    /// email confirmation, in which case no session exists yet.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>, GateError> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?
            .error_for_status()?;

        let session: TokenResponse = response.json().await?;
        match session.access_token {
            Some(token) => self.adopt_token(&token, session.refresh_token).map(Some),
            None => {
                tracing::info!("signup accepted; awaiting email confirmation");
                Ok(None)
            }
        }
    }

    /// Exchanges the stored refresh token for a fresh access token.
    pub async fn refresh_session(&self) -> Result<Identity, GateError> {
        let refresh_token = self.refresh_token().ok_or_else(|| {
            GateError::AuthOperationFailed("no refresh token available".to_string())
        })?;

        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn current_session(&self) -> Result<Option<Identity>, GateError> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };

        match decode_claims(&token, &self.jwt_secret) {
            Ok(claims) => Ok(Some(claims.identity())),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                tracing::debug!("stored access token expired");
                self.clear_tokens();
                Ok(None)
            }
            Err(e) => Err(GateError::AuthOperationFailed(format!(
                "stored access token is invalid: {e}"
            ))),
        }
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<SessionChange, GateError> {
        if let Some(token) = self.access_token() {
            let response = self
                .client
                .post(self.url("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(token)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(GateError::AuthOperationFailed(format!(
                    "logout returned {}",
                    response.status()
                )));
            }
        }

        self.clear_tokens();
        Ok(self.events.emit(SessionEvent::SignedOut))
    }
}

// --- In-memory provider ---

/// InMemoryIdentityProvider
///
/// A provider without a backend, for tests and offline local runs. Failures can be
/// scripted to exercise the error paths.
pub struct InMemoryIdentityProvider {
    identity: Mutex<Option<Identity>>,
    events: SessionEvents,
    fail_resolution: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self {
            identity: Mutex::new(None),
            events: SessionEvents::default(),
            fail_resolution: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
        }
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that already holds a session at startup.
    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::default();
        *provider.lock_identity() = Some(identity);
        provider
    }

    fn lock_identity(&self) -> std::sync::MutexGuard<'_, Option<Identity>> {
        self.identity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sign_in(&self, identity: Identity) {
        *self.lock_identity() = Some(identity.clone());
        self.events.emit(SessionEvent::SignedIn(identity));
    }

    pub fn refresh(&self, identity: Identity) {
        *self.lock_identity() = Some(identity.clone());
        self.events.emit(SessionEvent::TokenRefreshed(identity));
    }

    /// Provider-side session end (expiry, revocation in another tab).
    pub fn expire(&self) {
        *self.lock_identity() = None;
        self.events.emit(SessionEvent::SignedOut);
    }

    pub fn fail_resolution(&self, fail: bool) {
        self.fail_resolution.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_session(&self) -> Result<Option<Identity>, GateError> {
        if self.fail_resolution.load(Ordering::SeqCst) {
            return Err(GateError::AuthOperationFailed(
                "session resolution unavailable".to_string(),
            ));
        }
        Ok(self.lock_identity().clone())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<SessionChange, GateError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(GateError::AuthOperationFailed(
                "sign-out request failed".to_string(),
            ));
        }
        *self.lock_identity() = None;
        Ok(self.events.emit(SessionEvent::SignedOut))
    }
}
