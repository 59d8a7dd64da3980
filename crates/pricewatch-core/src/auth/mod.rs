//! Authentication: the session state machine and where its token lives.
//!
//! This module provides:
//! - `transition`: pure `(SessionState, SessionEvent) -> SessionState`
//! - `SessionManager`: performs the requests and store writes around it
//! - `TokenStore`: durable token storage (file, OS keychain, or memory)
//!
//! A token is only ever held in one place at a time: when it changes, the
//! store and the outgoing request header are updated together.

pub mod backend;
pub mod credentials;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::AuthBackend;
pub use credentials::KeyringTokenStore;
pub use session::{AuthOutcome, SessionManager};
pub use state::{transition, SessionEvent, SessionState, SessionStatus, NO_TOKEN_REASON};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
