//! REST client for the price-tracking backend.
//!
//! `ApiClient` implements the auth endpoints the session manager drives and
//! the product endpoints the rest of the application uses. Clones share one
//! connection pool and one bearer credential.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
