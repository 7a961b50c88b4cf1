use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    engine,
    identity::IdentityState,
    modal::ModalStore,
    models::{Action, ContentItem, Decision, Effect, Target},
    navigation::NavigatorState,
    session::SessionStore,
    tier::{TierState, tier_for_session},
};

/// GateServices
///
/// Everything a gate controller needs, built once and shared. Reads may come from
/// anywhere; writes only happen through the stores' own entry points.
pub struct GateServices {
    pub sessions: Arc<SessionStore>,
    pub modal: Arc<ModalStore>,
    pub tiers: TierState,
    pub navigator: NavigatorState,
    pub upgrade_target: Target,
}

impl GateServices {
    /// Performs the one side effect of an interaction.
    pub fn perform(&self, effect: &Effect) {
        match effect {
            Effect::OpenModal { mode } => self.modal.open(*mode),
            Effect::Navigate { target } => self.navigator.navigate(target),
        }
    }
}

/// ContentGate
///
/// The controller behind one content card. Asks the engine, then either opens the login
/// modal or navigates; never both.
pub struct ContentGate {
    item: ContentItem,
    services: Arc<GateServices>,
}

impl ContentGate {
    pub fn new(item: ContentItem, services: Arc<GateServices>) -> Self {
        Self { item, services }
    }

    pub fn item(&self) -> &ContentItem {
        &self.item
    }

    /// handle_interaction
    ///
    /// 1. Snapshot the session and (for signed-in viewers) await the tier lookup.
    /// 2. `decide`.
    /// 3. `RequireAuth` opens the login modal, `RequireUpgrade` navigates to the upgrade
    ///    surface without touching the modal, `Allow` navigates to the target.
    pub async fn handle_interaction(&self, action: Action) -> Decision {
        let session = self.services.sessions.current_session();
        let tier = tier_for_session(self.services.tiers.as_ref(), &session).await;

        let decision = engine::decide(&session, tier, &self.item, action);
        let effect = Effect::for_decision(&decision, &self.services.upgrade_target);

        tracing::debug!(
            item = %self.item.id,
            ?action,
            %tier,
            ?decision,
            "gate interaction"
        );

        self.services.perform(&effect);
        decision
    }

    /// Whether the card shows the "Upgrade to access" notice for the current viewer.
    pub async fn shows_upgrade_notice(&self) -> bool {
        let session = self.services.sessions.current_session();
        let tier = tier_for_session(self.services.tiers.as_ref(), &session).await;
        engine::shows_upgrade_notice(&session, tier, &self.item)
    }

    /// The explicit "Upgrade to access" link.
    pub fn handle_upgrade_click(&self) {
        tracing::debug!(item = %self.item.id, "upgrade link clicked");
        self.services.navigator.navigate(&self.services.upgrade_target);
    }
}

/// GateRuntime
///
/// Owns the process-wide stores and their background listeners.
///
/// Lifecycle: `start` (construct stores, attach to the provider, resolve the initial
/// session) → hand out `ContentGate`s → `shutdown` (or drop) stops the listeners.
pub struct GateRuntime {
    services: Arc<GateServices>,
    tasks: Vec<JoinHandle<()>>,
}

impl GateRuntime {
    /// start
    ///
    /// The listener is attached before the initial resolution so no provider event is
    /// missed. A failed resolution is not fatal: the viewer starts signed out.
    pub async fn start(
        provider: IdentityState,
        tiers: TierState,
        navigator: NavigatorState,
        upgrade_target: Target,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(provider));
        let modal = Arc::new(ModalStore::new());

        let tasks = vec![sessions.listen(), modal.close_on_sign_in(&sessions)];

        if let Err(e) = sessions.resolve().await {
            tracing::warn!(notice = e.notice(), "starting without a resolved session");
        }

        let services = Arc::new(GateServices {
            sessions,
            modal,
            tiers,
            navigator,
            upgrade_target,
        });

        Self { services, tasks }
    }

    pub fn services(&self) -> &Arc<GateServices> {
        &self.services
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.services.sessions
    }

    pub fn modal(&self) -> &ModalStore {
        &self.services.modal
    }

    pub fn content_gate(&self, item: ContentItem) -> ContentGate {
        ContentGate::new(item, Arc::clone(&self.services))
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for GateRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
