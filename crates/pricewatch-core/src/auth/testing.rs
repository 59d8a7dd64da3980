//! Scripted in-memory backend for session tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::AuthBackend;
use crate::api::ApiError;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User, UserId};

/// One request as the backend saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub bearer: Option<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    login_replies: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    signup_replies: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    me_replies: Mutex<VecDeque<Result<User, ApiError>>>,
    bearer: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

pub fn user(id: i64, name: &str) -> User {
    User::new(UserId::Number(id), name)
}

pub fn accepted(token: &str, user: User, message: Option<&str>) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        token: token.to_string(),
        user,
        message: message.map(str::to_string),
    })
}

pub fn rejected(status: u16, body: &str) -> ApiError {
    let status = reqwest::StatusCode::from_u16(status).expect("valid status code");
    ApiError::from_status(status, body)
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_login(self, reply: Result<AuthResponse, ApiError>) -> Self {
        self.login_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_signup(self, reply: Result<AuthResponse, ApiError>) -> Self {
        self.signup_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_me(self, reply: Result<User, ApiError>) -> Self {
        self.me_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Header that the next request would carry
    pub fn bearer(&self) -> Option<String> {
        self.bearer.lock().unwrap().clone()
    }

    fn record(&self, endpoint: &'static str) {
        let bearer = self.bearer();
        self.calls.lock().unwrap().push(RecordedCall { endpoint, bearer });
    }

    fn unscripted() -> ApiError {
        ApiError::InvalidResponse("no scripted reply".to_string())
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.record("/auth/login");
        let reply = self.login_replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn signup(&self, _request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.record("/auth/signup");
        let reply = self.signup_replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.record("/auth/me");
        let reply = self.me_replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(Self::unscripted()))
    }

    fn apply_token(&self, token: Option<&str>) {
        *self.bearer.lock().unwrap() = token.map(str::to_string);
    }
}
