use crate::{
    error::GateError,
    models::{Session, SessionStatus, Target},
    navigation::Navigator,
    session::SessionStore,
};

/// PageAccess
///
/// What a members-only page (e.g. "For You") should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAccess {
    /// The provider has not answered yet; render a loading placeholder.
    Loading,
    Redirect(Target),
    Render,
}

pub fn guard_page(session: &Session, home: &Target) -> PageAccess {
    match session.status {
        SessionStatus::Unresolved => PageAccess::Loading,
        SessionStatus::Anonymous => PageAccess::Redirect(home.clone()),
        SessionStatus::Authenticated => PageAccess::Render,
    }
}

/// logout
///
/// The page's logout button: sign out, then go home. A failed sign-out keeps the viewer
/// where they are and returns the error for a notice.
pub async fn logout(
    sessions: &SessionStore,
    navigator: &dyn Navigator,
    home: &Target,
) -> Result<(), GateError> {
    sessions.sign_out().await?;
    navigator.navigate(home);
    Ok(())
}
