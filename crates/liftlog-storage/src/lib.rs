//! Session persistence for the LiftLog client.
//!
//! The browser build of this client kept its session in localStorage; here
//! the same role is played by a JSON file under the client's base directory.
//! Storage is plain key-value: the typed [`SessionStore`] facade sits on top
//! and owns the well-known auth keys.

mod file;
mod keys;
mod session_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use session_store::{PersistedSession, PersistedToken, SessionStore};
pub use traits::KeyValueStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
