//! Client core for a price-tracking service.
//!
//! The interesting part is [`auth`]: a session state machine that acquires a
//! bearer token, persists it, attaches it to every request made through
//! [`api::ApiClient`], and signs the user out when the backend stops
//! accepting it. The rest is request/response plumbing and input checks for
//! the front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthOutcome, SessionManager, SessionState, SessionStatus};
pub use config::Config;
