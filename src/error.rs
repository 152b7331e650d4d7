//! Centralized error types for phishsift.
//!
//! Message-level irregularities (undecodable parts, missing headers, broken
//! `Content-Disposition` values) are absorbed where they occur and never show
//! up here. Only setup mismatches and I/O problems are surfaced.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the phishsift library.
#[derive(Error, Debug)]
pub enum PhishError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The file does not appear to be a valid MBOX.
    #[error("File does not appear to be a valid MBOX: {0}")]
    InvalidMbox(PathBuf),

    /// Paired input/output column lists differ in length.
    #[error(
        "Dimensions of the input columns ({inputs}) and attributes to add ({outputs}) cannot differ"
    )]
    AttributeMismatch { inputs: usize, outputs: usize },

    /// A field or column label that the field-set or feature matrix does not have.
    #[error("Unknown field or column: '{0}'")]
    UnknownField(String),

    /// The external classifier failed to produce a probability.
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Moving a message on the remote mailbox failed.
    #[error("Moving message {uid} to '{destination}' failed: {reason}")]
    Relocation {
        uid: String,
        destination: String,
        reason: String,
    },
}

/// Convenience alias for `Result<T, PhishError>`.
pub type Result<T> = std::result::Result<T, PhishError>;

impl PhishError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error` on `path`, turning `NotFound` into [`PhishError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `PhishError::io`).
impl From<std::io::Error> for PhishError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
