use thiserror::Error;

/// GateError
///
/// Every failure the gate can observe. None of them is fatal: the stores recover
/// locally and the presentation layer shows `notice()` with a retry affordance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    /// Sign-out, sign-in or the initial session resolution failed at the identity provider.
    #[error("auth operation failed: {0}")]
    AuthOperationFailed(String),

    /// The subscription-tier source was unreachable or returned invalid data.
    #[error("tier lookup failed: {0}")]
    TierLookupFailed(String),
}

impl GateError {
    /// Short, user-facing text for the non-fatal notice.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::AuthOperationFailed(_) => {
                "We couldn't reach the sign-in service. Please try again."
            }
            Self::TierLookupFailed(_) => {
                "We couldn't confirm your subscription. Premium content is locked for now."
            }
        }
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        Self::AuthOperationFailed(err.to_string())
    }
}

impl From<sqlx::Error> for GateError {
    fn from(err: sqlx::Error) -> Self {
        Self::TierLookupFailed(err.to_string())
    }
}
