//! Session store.
//!
//! ```text
//!  Unresolved ──resolve()──► Anonymous ◄──SignedOut── Authenticated
//!       │                        │                        ▲
//!       └──────resolve()─────────┼────────────────────────┘
//!                                └──────SignedIn──────────►
//! ```
//!
//! `Unresolved` is only ever the initial state. Provider changes reach the store through
//! `apply`, fed both by the listener task and by `sign_out`. Each change carries the
//! provider's sequence number and the store applies a number at most once, so a change
//! delivered late by the listener can never undo a newer one.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::{
    error::GateError,
    identity::{IdentityState, SessionChange, SessionEvent},
    models::Session,
    store::{StateCell, Subscription},
};

/// SessionStore
///
/// Process-wide holder of the viewer's authentication state. Constructed once at
/// startup and injected into whatever needs it.
pub struct SessionStore {
    state: StateCell<Session>,
    provider: IdentityState,
    last_applied: Mutex<u64>,
}

impl SessionStore {
    pub fn new(provider: IdentityState) -> Self {
        Self {
            state: StateCell::new(Session::unresolved()),
            provider,
            last_applied: Mutex::new(0),
        }
    }

    /// Last known session. Never waits on the provider.
    pub fn current_session(&self) -> Session {
        self.state.get()
    }

    /// The subscription yields the current session first, then every transition.
    pub fn subscribe(&self) -> Subscription<Session> {
        self.state.subscribe()
    }

    /// apply
    ///
    /// The single writer for provider changes. Returns whether the change produced a
    /// transition. A change at or below the last applied sequence number is stale and
    /// dropped; a change that leaves the session unchanged (a repeated sign-out, say)
    /// notifies nobody.
    pub fn apply(&self, change: SessionChange) -> bool {
        let mut last_applied = self
            .last_applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if change.seq <= *last_applied {
            tracing::debug!(seq = change.seq, "stale session change dropped");
            return false;
        }
        *last_applied = change.seq;

        let next = match change.event {
            SessionEvent::SignedIn(identity) | SessionEvent::TokenRefreshed(identity) => {
                Session::authenticated(identity)
            }
            SessionEvent::SignedOut => Session::anonymous(),
        };

        let changed = self.state.replace_if_changed(next);
        if changed {
            tracing::debug!(status = ?self.state.get().status, "session transition");
        }
        changed
    }

    /// resolve
    ///
    /// One-shot initial resolution. If a provider event already resolved the session
    /// while the request was in flight, that newer state wins.
    ///
    /// A failed resolution leaves the viewer `Anonymous` and reports `AuthOperationFailed`.
    pub async fn resolve(&self) -> Result<Session, GateError> {
        if self.state.get().is_resolved() {
            return Ok(self.state.get());
        }

        let (resolved, outcome) = match self.provider.current_session().await {
            Ok(Some(identity)) => (Session::authenticated(identity), Ok(())),
            Ok(None) => (Session::anonymous(), Ok(())),
            Err(e) => {
                tracing::warn!(error = %e, "session resolution failed; continuing signed out");
                (Session::anonymous(), Err(e))
            }
        };

        self.state.update(|current| {
            if current.is_resolved() {
                current.clone()
            } else {
                resolved
            }
        });

        outcome.map(|_| self.state.get())
    }

    /// listen
    ///
    /// Forwards the provider's session callbacks into the store. The task stops when the
    /// provider closes its channel or the store is dropped.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.provider.on_session_change();
        let store: Weak<SessionStore> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let change = match events.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session listener lagged behind the provider");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(store) = store.upgrade() else { break };
                store.apply(change);
            }
            tracing::debug!("session listener stopped");
        })
    }

    /// sign_out
    ///
    /// Asks the provider to end the session. Only a confirmed sign-out moves the store
    /// to `Anonymous`; on failure the session is left exactly as it was. Changes the
    /// listener has not delivered yet are older than the sign-out and get dropped.
    pub async fn sign_out(&self) -> Result<(), GateError> {
        match self.provider.sign_out().await {
            Ok(change) => {
                self.apply(change);
                tracing::info!("signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-out failed; session unchanged");
                Err(e)
            }
        }
    }
}
