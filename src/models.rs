use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::GateError;
use crate::navigation::routes;

// --- Session Schemas ---

/// Identity
///
/// The opaque user reference carried by an authenticated session. Resolved from the
/// identity provider's access token (`sub` and `email` claims).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
    // Expiry of the access token backing this identity. A token refresh moves it forward.
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            email: None,
            expires_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// SessionStatus
///
/// `Unresolved` only exists between process start and the provider's first answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionStatus {
    Unresolved,
    Anonymous,
    Authenticated,
}

/// Session
///
/// The viewer's authentication status plus optional identity. Owned by the `SessionStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
}

impl Session {
    pub fn unresolved() -> Self {
        Self {
            status: SessionStatus::Unresolved,
            identity: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            identity: None,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            identity: Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_resolved(&self) -> bool {
        self.status != SessionStatus::Unresolved
    }
}

/// SubscriptionTier
///
/// The viewer's plan. Serialized with the same identifiers the profile store uses
/// (`basic`, `premium`, `premium-plus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Premium,
    PremiumPlus,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [Self::Basic, Self::Premium, Self::PremiumPlus];

    /// Any paid plan.
    pub fn is_subscribed(self) -> bool {
        self != Self::Basic
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::PremiumPlus => "premium-plus",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "premium-plus" => Ok(Self::PremiumPlus),
            other => Err(GateError::TierLookupFailed(format!(
                "unknown subscription tier '{other}'"
            ))),
        }
    }
}

// --- Content Schemas ---

/// Target
///
/// An opaque navigable reference (a client-side route). The controller hands it to the
/// `Navigator` without inspecting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Target(pub String);

impl Target {
    pub fn new(route: impl Into<String>) -> Self {
        Self(route.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AccessRequirement {
    Free,
    SubscriptionRequired,
}

/// ContentItem
///
/// The gate's view of a piece of content. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContentItem {
    pub id: String,
    pub access: AccessRequirement,
    pub primary_target: Target,
    // Alternate consumption mode (the audio player).
    #[serde(default)]
    pub secondary_target: Option<Target>,
}

/// Action
///
/// `Primary` is "Read" (or a click on the card body); `Secondary` is "Listen".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Action {
    #[default]
    Primary,
    Secondary,
}

/// Book
///
/// A catalog entry as delivered by the summary catalog API.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub book_description: Option<String>,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub audio_link: Option<String>,
    #[serde(default)]
    pub subscription_required: bool,
}

impl Book {
    /// Projects the catalog entry onto the gate's `ContentItem`. The player route only
    /// exists for books that carry an audio link.
    pub fn content_item(&self) -> ContentItem {
        let has_audio = self
            .audio_link
            .as_deref()
            .is_some_and(|link| !link.trim().is_empty());

        ContentItem {
            id: self.id.clone(),
            access: if self.subscription_required {
                AccessRequirement::SubscriptionRequired
            } else {
                AccessRequirement::Free
            },
            primary_target: routes::book(&self.id),
            secondary_target: has_audio.then(|| routes::player(&self.id)),
        }
    }
}

// --- Gate Outcome Schemas ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ModalMode {
    Login,
    Signup,
}

/// ModalState
///
/// The single global gating modal. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ModalState {
    #[default]
    Closed,
    Login,
    Signup,
}

impl From<ModalMode> for ModalState {
    fn from(mode: ModalMode) -> Self {
        match mode {
            ModalMode::Login => Self::Login,
            ModalMode::Signup => Self::Signup,
        }
    }
}

impl ModalState {
    pub fn is_open(self) -> bool {
        self != Self::Closed
    }
}

/// Decision
///
/// Transient result of one gate evaluation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum Decision {
    Allow { target: Target },
    RequireAuth,
    RequireUpgrade,
}

/// Effect
///
/// The single side effect a decision produces. Being one enum value, an interaction can
/// never both open a modal and navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Effect {
    OpenModal { mode: ModalMode },
    Navigate { target: Target },
}

impl Effect {
    pub fn for_decision(decision: &Decision, upgrade_target: &Target) -> Self {
        match decision {
            Decision::RequireAuth => Effect::OpenModal {
                mode: ModalMode::Login,
            },
            Decision::RequireUpgrade => Effect::Navigate {
                target: upgrade_target.clone(),
            },
            Decision::Allow { target } => Effect::Navigate {
                target: target.clone(),
            },
        }
    }
}

// --- Request/Response Payloads ---

/// GateRequest
///
/// Input payload for the advisory decision endpoint (POST /gate/decide).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GateRequest {
    pub item: ContentItem,
    #[serde(default)]
    pub action: Action,
}

/// GateResponse
///
/// The decision plus the effect the client is expected to perform, and whether the
/// "Upgrade to access" notice should be rendered on the card.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GateResponse {
    pub decision: Decision,
    pub effect: Effect,
    pub upgrade_notice: bool,
}

/// ViewerSession
///
/// Output schema for GET /me/session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewerSession {
    pub session: Session,
    pub tier: SubscriptionTier,
}
