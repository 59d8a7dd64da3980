use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User};

/// The backend's authentication surface, as seen by the session manager.
///
/// `apply_token` is the "token changed" hook: the implementor must attach
/// `Authorization: Bearer <token>` to every request it issues afterwards, or
/// stop sending the header when passed `None`.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError>;

    /// "Who am I", authenticated with the currently applied token
    async fn current_user(&self) -> Result<User, ApiError>;

    fn apply_token(&self, token: Option<&str>);
}
