//! Error types for the session subsystem.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::encrypter::EncryptionError;

/// Errors surfaced by session handlers, stores, and the manager.
///
/// Missing, undecodable, or tampered payloads are not errors: stores degrade
/// to an empty session instead. Only storage failures and configuration
/// mistakes reach the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A handler failed to read or write its backing storage.
    #[error("session storage error for {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The session id cannot be mapped safely onto storage.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// No built-in or registered driver matches the requested name.
    #[error("session driver [{0}] is not supported")]
    UnknownDriver(String),

    /// Encryption is enabled but no encrypter or `app.key` is available.
    #[error("session encryption is enabled but no encryption key is configured (set app.key)")]
    MissingEncryptionKey,

    /// The payload could not be encoded before writing.
    #[error("failed to encode session payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Encrypting the payload failed.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

impl SessionError {
    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn storage(path: &Path, source: io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Storage { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
