//! Access-decision engine.
//!
//! Pure functions only: given the viewer's session, the viewer's tier, a content item
//! and the requested action, produce a `Decision`. Side effects belong to the
//! controller (see `controller::ContentGate`).
//!
//! Rules, first match wins:
//!
//! | Session        | Requirement            | Tier              | Decision         |
//! |----------------|------------------------|-------------------|------------------|
//! | not signed in  | any                    | any               | `RequireAuth`    |
//! | authenticated  | `SubscriptionRequired` | `Basic`           | `RequireUpgrade` |
//! | authenticated  | otherwise              | any               | `Allow(target)`  |
//!
//! Auth is checked before the subscription, so an anonymous viewer is never
//! offered an upgrade.

use crate::models::{
    AccessRequirement, Action, ContentItem, Decision, Session, SubscriptionTier, Target,
};

/// decide
///
/// Deterministic for a given input tuple. A `Secondary` action on an item without a
/// secondary target falls back to the primary target; the engine never fails.
pub fn decide(
    session: &Session,
    tier: SubscriptionTier,
    item: &ContentItem,
    action: Action,
) -> Decision {
    if !session.is_authenticated() {
        return Decision::RequireAuth;
    }

    if item.access == AccessRequirement::SubscriptionRequired && !tier.is_subscribed() {
        return Decision::RequireUpgrade;
    }

    Decision::Allow {
        target: target_for(item, action).clone(),
    }
}

/// Resolves which route an action opens once access is granted.
pub fn target_for(item: &ContentItem, action: Action) -> &Target {
    match (action, &item.secondary_target) {
        (Action::Secondary, Some(secondary)) => secondary,
        _ => &item.primary_target,
    }
}

/// shows_upgrade_notice
///
/// Whether the card renders the "Premium content - Upgrade to access" notice. It is
/// shown exactly when the primary action would be answered with `RequireUpgrade`.
pub fn shows_upgrade_notice(session: &Session, tier: SubscriptionTier, item: &ContentItem) -> bool {
    decide(session, tier, item, Action::Primary) == Decision::RequireUpgrade
}
