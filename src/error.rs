//! Error types for quill.
//!
//! Uses thiserror for derive macros. Each variant carries a message that is
//! safe to show to the browser client.

use thiserror::Error;

/// Main error type for quill operations.
///
/// Each variant maps to an HTTP status via [`QuillError::status_code`].
#[derive(Error, Debug)]
pub enum QuillError {
    /// Another editor holds an unexpired lock, or the presented token is wrong.
    #[error("file is locked by another editor: {0}")]
    LockDenied(String),

    /// The resource name is empty or contains path components.
    #[error("invalid filename: {0}")]
    InvalidName(String),

    /// A document or output file could not be read or written.
    #[error("{0}")]
    Io(String),

    /// The external converter is missing, failed, or timed out.
    #[error("export failed: {0}")]
    Export(String),

    /// A requested document does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The configuration file or flags are invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl QuillError {
    /// Returns the HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            QuillError::LockDenied(_) => 423,
            QuillError::InvalidName(_) => 400,
            QuillError::NotFound(_) => 404,
            QuillError::Io(_) | QuillError::Export(_) | QuillError::Config(_) => 500,
        }
    }
}

/// Result type alias for quill operations.
pub type Result<T> = std::result::Result<T, QuillError>;
