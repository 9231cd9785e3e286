//! Structured error handling and exit codes.

use serde::Serialize;

use crate::session::SessionError;

/// Exit codes for the lumberjack-session binary.
///
/// - 0: Success
/// - 1: General error (unexpected failure, storage I/O)
/// - 2: Session not found (`show` on an id with no stored data)
/// - 3: Configuration error (unknown driver, missing key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Not found: no session is stored under the requested id.
    SessionNotFound = 2,
    /// Configuration error: the driver or encryption setup is invalid.
    ConfigurationError = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LS000",
            Self::GeneralError => "LS001",
            Self::SessionNotFound => "LS002",
            Self::ConfigurationError => "LS003",
        }
    }

    /// Pick the exit code for a failed run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<SessionError>() {
            Some(
                SessionError::UnknownDriver(_)
                | SessionError::MissingEncryptionKey
                | SessionError::Encryption(_),
            ) => Self::ConfigurationError,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
        }
    }
}
