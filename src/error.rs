//! Centralized error types for emlbox.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlbox library.
///
/// Malformed MIME never produces an error: missing or unparseable headers
/// leave the corresponding attribute unset instead of failing.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox path is not a directory (strict open only).
    #[error("Mailbox path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The requested message id is outside the tracked range.
    #[error("No message with id {0}")]
    InvalidId(usize),

    /// A pending deletion could not be committed at close.
    #[error("Failed to delete '{path}': {source}")]
    DeleteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, MailboxError>`.
pub type Result<T> = std::result::Result<T, MailboxError>;

impl MailboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
