use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;

use crate::{
    models::{ModalMode, ModalState},
    session::SessionStore,
    store::{StateCell, Subscription},
};

/// ModalStore
///
/// The single global login/signup modal. Opening always overwrites the previous mode,
/// which is what keeps at most one gating modal on screen. Concurrent opens are last
/// write wins; there is no queue.
pub struct ModalStore {
    state: StateCell<ModalState>,
}

impl Default for ModalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalStore {
    pub fn new() -> Self {
        Self {
            state: StateCell::new(ModalState::Closed),
        }
    }

    pub fn open(&self, mode: ModalMode) {
        if self.state.replace_if_changed(mode.into()) {
            tracing::debug!(?mode, "modal opened");
        }
    }

    pub fn close(&self) {
        if self.state.replace_if_changed(ModalState::Closed) {
            tracing::debug!("modal closed");
        }
    }

    pub fn current(&self) -> ModalState {
        self.state.get()
    }

    pub fn subscribe(&self) -> Subscription<ModalState> {
        self.state.subscribe()
    }

    /// The "switch to signup" / "switch to login" link inside the modal. No-op when closed.
    pub fn switch_mode(&self) {
        self.state.update(|current| match current {
            ModalState::Login => ModalState::Signup,
            ModalState::Signup => ModalState::Login,
            ModalState::Closed => ModalState::Closed,
        });
    }

    /// close_on_sign_in
    ///
    /// Dismisses the modal whenever the session moves into `Authenticated`.
    pub fn close_on_sign_in(self: &Arc<Self>, sessions: &SessionStore) -> JoinHandle<()> {
        let mut updates = sessions.subscribe();
        let modal: Weak<ModalStore> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut was_authenticated = match updates.recv().await {
                Some(session) => session.is_authenticated(),
                None => return,
            };

            while let Some(session) = updates.recv().await {
                let now_authenticated = session.is_authenticated();
                if now_authenticated && !was_authenticated {
                    let Some(modal) = modal.upgrade() else { break };
                    modal.close();
                }
                was_authenticated = now_authenticated;
            }
        })
    }
}
