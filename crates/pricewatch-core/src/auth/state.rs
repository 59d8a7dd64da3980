//! Session state and its pure transition function.
//!
//! Nothing in here touches the network or the token store. The effect layer
//! in [`super::session`] performs those calls and feeds their results back
//! in as [`SessionEvent`]s.

use serde::Serialize;

use crate::models::User;

/// Failure reason recorded when startup finds no persisted token.
pub const NO_TOKEN_REASON: &str = "no token";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason")]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed(String),
}

impl SessionStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SessionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    #[serde(skip)]
    pub token: Option<String>,
    pub user: Option<User>,
    pub status: SessionStatus,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            token: None,
            user: None,
            status: SessionStatus::Unauthenticated,
            error: None,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// The main view is shown whenever a user is loaded; otherwise the
    /// login/signup view.
    pub fn shows_main_view(&self) -> bool {
        self.user.is_some()
    }

    fn cleared(status: SessionStatus, error: Option<String>) -> Self {
        Self {
            token: None,
            user: None,
            status,
            error,
        }
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Startup found a persisted token
    StartupWithToken(String),
    /// Startup found nothing in the store
    StartupWithoutToken,
    /// A login or signup request is about to be issued
    CredentialRequested,
    CredentialAccepted { token: String, user: User },
    CredentialRejected(String),
    /// "Who am I" answered with the current user
    UserLoaded(User),
    /// "Who am I" failed for any reason
    UserLoadFailed,
    LoggedOut,
}

/// Compute the next state. Pairs that have no entry in the transition table
/// return the state unchanged.
pub fn transition(state: SessionState, event: SessionEvent) -> SessionState {
    use SessionEvent as E;
    use SessionStatus as S;

    let status = state.status.clone();
    match (status, event) {
        (S::Unauthenticated, E::StartupWithToken(token)) => SessionState {
            token: Some(token),
            user: None,
            status: S::Authenticating,
            error: None,
        },
        (S::Unauthenticated, E::StartupWithoutToken) => SessionState::cleared(
            S::Failed(NO_TOKEN_REASON.to_string()),
            Some(NO_TOKEN_REASON.to_string()),
        ),

        // Allowed from any state; a fresh attempt discards the old error.
        // The user is dropped so a pending attempt never reads as signed in.
        (_, E::CredentialRequested) => SessionState {
            token: state.token,
            user: None,
            status: S::Authenticating,
            error: None,
        },

        (S::Authenticating, E::CredentialAccepted { token, user }) => SessionState {
            token: Some(token),
            user: Some(user),
            status: S::Authenticated,
            error: None,
        },
        (S::Authenticating, E::CredentialRejected(reason)) => {
            SessionState::cleared(S::Failed(reason.clone()), Some(reason))
        }

        // Only meaningful while a token is waiting to be confirmed.
        (S::Authenticating, E::UserLoaded(user)) if state.token.is_some() => SessionState {
            user: Some(user),
            status: S::Authenticated,
            error: None,
            ..state
        },
        (S::Authenticating, E::UserLoadFailed) => {
            SessionState::cleared(S::Unauthenticated, None)
        }

        (_, E::LoggedOut) => SessionState::cleared(S::Unauthenticated, None),

        _ => state,
    }
}
