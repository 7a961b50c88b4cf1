use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    error::GateError,
    models::{Identity, Session, SubscriptionTier},
};

/// TierSource Trait
///
/// Where a viewer's subscription tier comes from. The gate only reads it; upgrades and
/// payments happen elsewhere.
#[async_trait]
pub trait TierSource: Send + Sync {
    async fn tier_of(&self, identity: &Identity) -> Result<SubscriptionTier, GateError>;
}

/// TierState
///
/// The shared handle used by controllers and HTTP handlers.
pub type TierState = Arc<dyn TierSource>;

/// PostgresTierSource
///
/// Reads `subscription_tier` from the `public.profiles` row mirroring the auth user.
pub struct PostgresTierSource {
    pool: PgPool,
}

impl PostgresTierSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TierSource for PostgresTierSource {
    async fn tier_of(&self, identity: &Identity) -> Result<SubscriptionTier, GateError> {
        let row: Option<Option<String>> =
            sqlx::query_scalar("SELECT subscription_tier FROM profiles WHERE id = $1")
                .bind(identity.id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Err(GateError::TierLookupFailed(format!(
                "no profile for user {}",
                identity.id
            ))),
            Some(None) => Err(GateError::TierLookupFailed(format!(
                "profile {} has no subscription tier",
                identity.id
            ))),
            Some(Some(tier)) => tier.parse(),
        }
    }
}

/// FixedTierSource
///
/// Every viewer is on the same plan. Used when no profile database is configured, where
/// everyone is treated as `basic`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTierSource(pub SubscriptionTier);

#[async_trait]
impl TierSource for FixedTierSource {
    async fn tier_of(&self, _identity: &Identity) -> Result<SubscriptionTier, GateError> {
        Ok(self.0)
    }
}

/// resolve_tier
///
/// Fail-closed lookup: an unconfirmed tier is `Basic`, so a broken tier source can only
/// ever lock premium content, never unlock it.
pub async fn resolve_tier(source: &dyn TierSource, identity: &Identity) -> SubscriptionTier {
    match source.tier_of(identity).await {
        Ok(tier) => tier,
        Err(e) => {
            tracing::warn!(user_id = %identity.id, error = %e, "tier lookup failed; assuming basic");
            SubscriptionTier::Basic
        }
    }
}

/// The tier to feed the engine for a session. Anonymous viewers skip the lookup; the
/// engine ignores the tier until the viewer is authenticated.
pub async fn tier_for_session(source: &dyn TierSource, session: &Session) -> SubscriptionTier {
    match (&session.identity, session.is_authenticated()) {
        (Some(identity), true) => resolve_tier(source, identity).await,
        _ => SubscriptionTier::Basic,
    }
}
