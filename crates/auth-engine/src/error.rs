//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login rejected by the server; carries the server's detail message
    #[error("{0}")]
    InvalidCredentials(String),

    /// A token-gated operation was called with no logged-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session was authoritatively ended: the refresh token expired or
    /// the server no longer recognizes it
    #[error("Session expired")]
    SessionExpired,

    /// Authoritative server rejection outside the credential path
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Network or server hiccup; prior state is preserved and the call can
    /// be retried
    #[error("Transient error: {0}")]
    Transient(String),

    /// A token whose claims could not be decoded
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Invalid transition in the session state machine
    #[error("Invalid session state transition: {0}")]
    InvalidTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] liftlog_storage::StorageError),
}

impl AuthError {
    /// Returns true if the operation can be retried with no state change.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Transient(_))
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
