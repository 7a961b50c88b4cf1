use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Target;

/// Navigator
///
/// The host's client-side router. `navigate` is fire-and-forget: the gate never
/// inspects what happened after the push.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &Target);
}

/// NavigatorState
///
/// The shared handle injected into gate controllers and page guards.
pub type NavigatorState = Arc<dyn Navigator>;

/// Well-known client routes.
pub mod routes {
    use crate::models::Target;

    pub const HOME: &str = "/";
    pub const CHOOSE_PLAN: &str = "/choose-plan";

    /// Reader page for a book summary.
    pub fn book(id: &str) -> Target {
        Target::new(format!("/book/{id}"))
    }

    /// Audio player for a book summary.
    pub fn player(id: &str) -> Target {
        Target::new(format!("/player/{id}"))
    }
}

/// RecordingNavigator
///
/// Keeps every navigation in order. Used by tests and by hosts that drain the history
/// into their own router.
#[derive(Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Target>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Target> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Target> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Takes the recorded history, leaving it empty.
    pub fn take(&self) -> Vec<Target> {
        std::mem::take(&mut *self.history.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &Target) {
        tracing::debug!(target = %target, "navigate");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.clone());
    }
}
