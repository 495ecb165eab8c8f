//! Session store: who is logged in and whether their credential is valid.
//!
//! # Lifecycle
//!
//! - Rehydrated from [`SessionStorage`] when the store is constructed; an
//!   expired or malformed record is discarded (logged-out, never a crash)
//! - Set by [`SessionStore::login`] from an authentication response
//! - Cleared by [`SessionStore::logout`] or when an expired token is detected
//!
//! Every change is mirrored into storage under [`keys::SESSION`]; the
//! transition to logged-out removes the record entirely.
//!
//! [`keys::SESSION`]: crate::models::keys::SESSION

mod storage;
mod store;
mod token;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
pub use token::{BearerToken, is_token_expired_at, token_expiry};

use thiserror::Error;

/// Errors that can occur in the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No active session, or the token has expired.
    #[error("Authentication required")]
    AuthRequired,

    /// The authentication response carried an already-expired token.
    #[error("Received an expired access token")]
    ExpiredToken,

    /// Persistent storage could not be read or written.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// The session record could not be serialized.
    #[error("Session serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Signals emitted by the session store for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user logged in.
    LoggedIn,
    /// The session was cleared by an explicit logout.
    LoggedOut,
    /// The stored token expired and the session was cleared.
    Expired,
    /// An operation needed a session and found none: redirect to login.
    LoginRequired,
}
