//! The session manager: effect layer around [`transition`].
//!
//! Each public operation performs its network and store calls, then feeds
//! the result back through the pure transition function. Token changes go to
//! the store and to the backend's request header in the same step.

use reqwest::header::HeaderValue;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::state::{transition, SessionEvent, SessionState, SessionStatus};
use super::{AuthBackend, TokenStore};
use crate::api::ApiError;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User};

const LOGIN_FALLBACK: &str = "Login failed";
const SIGNUP_FALLBACK: &str = "Signup failed";
const LOGIN_SUCCESS: &str = "Login successful";
const SIGNUP_SUCCESS: &str = "Account created";

/// Result of a login or signup attempt, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
}

impl AuthOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub struct SessionManager<B, S> {
    backend: B,
    store: S,
    state: SessionState,
    updates: watch::Sender<SessionState>,
}

impl<B: AuthBackend, S: TokenStore> SessionManager<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        let state = SessionState::default();
        let (updates, _) = watch::channel(state.clone());
        Self {
            backend,
            store,
            state,
            updates,
        }
    }

    /// Restore the previous session, if the store has a token for one.
    pub async fn start(&mut self) {
        if self.state.status != SessionStatus::Unauthenticated {
            debug!(status = ?self.state.status, "Session already started");
            return;
        }

        let persisted = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token, starting signed out");
                None
            }
        };

        match persisted {
            Some(token) => {
                debug!("Persisted token found, loading user");
                self.backend.apply_token(Some(&token));
                self.dispatch(SessionEvent::StartupWithToken(token));
                self.load_user().await;
            }
            None => {
                debug!("No persisted token found");
                self.dispatch(SessionEvent::StartupWithoutToken);
            }
        }
    }

    /// Confirm the pending token by asking the backend who it belongs to.
    ///
    /// Any failure signs the user out. That includes an unreachable server,
    /// which cannot be told apart from an expired token at this point.
    pub async fn load_user(&mut self) {
        if self.state.status != SessionStatus::Authenticating || self.state.token.is_none() {
            debug!(status = ?self.state.status, "No pending token to load a user for");
            return;
        }

        match self.backend.current_user().await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                self.dispatch(SessionEvent::UserLoaded(user));
            }
            Err(e) => {
                warn!(
                    error = %e,
                    auth_rejected = e.is_auth_rejection(),
                    "Failed to load current user, signing out"
                );
                self.set_token(None);
                self.dispatch(SessionEvent::UserLoadFailed);
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> AuthOutcome {
        self.dispatch(SessionEvent::CredentialRequested);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.backend.login(&request).await;
        self.finish_credential_request(result, LOGIN_FALLBACK, LOGIN_SUCCESS)
    }

    /// Create an account. Password confirmation and length are the caller's
    /// job; see [`crate::forms::SignupForm`].
    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> AuthOutcome {
        self.dispatch(SessionEvent::CredentialRequested);
        let request = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.backend.signup(&request).await;
        self.finish_credential_request(result, SIGNUP_FALLBACK, SIGNUP_SUCCESS)
    }

    pub fn logout(&mut self) {
        self.set_token(None);
        self.dispatch(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    fn finish_credential_request(
        &mut self,
        result: Result<AuthResponse, ApiError>,
        fallback: &str,
        default_success: &str,
    ) -> AuthOutcome {
        let result = result.and_then(|resp| {
            if resp.token.trim().is_empty() {
                return Err(ApiError::InvalidResponse("empty token".to_string()));
            }
            // A token that can't go in a header would fail every later request
            HeaderValue::from_str(&format!("Bearer {}", resp.token))?;
            Ok(resp)
        });

        match result {
            Ok(AuthResponse {
                token,
                user,
                message,
            }) => {
                self.set_token(Some(&token));
                info!(user_id = %user.id, "Authenticated");
                self.dispatch(SessionEvent::CredentialAccepted { token, user });
                AuthOutcome::success(message.unwrap_or_else(|| default_success.to_string()))
            }
            Err(e) => {
                error!(error = %e, "Credential request failed");
                let message = e.user_message(fallback);
                self.set_token(None);
                self.dispatch(SessionEvent::CredentialRejected(message.clone()));
                AuthOutcome::failure(message)
            }
        }
    }

    /// Apply the token to outgoing requests and persist it in one step.
    fn set_token(&self, token: Option<&str>) {
        self.backend.apply_token(token);
        let persisted = match token {
            Some(token) => self.store.save(token),
            None => self.store.clear(),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to update persisted token");
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let previous = std::mem::take(&mut self.state);
        let from = previous.status.clone();
        self.state = transition(previous, event);
        debug!(from = ?from, to = ?self.state.status, "Session transition");

        let next = &self.state;
        self.updates.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }

    // ===== State exposure =====

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> &SessionStatus {
        &self.state.status
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn shows_main_view(&self) -> bool {
        self.state.shows_main_view()
    }

    /// Watch every state change from here on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
