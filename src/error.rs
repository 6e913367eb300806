//! Structured error types for hierarchy operations.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Key path errors
    InvalidPath,
    MissingKeys,

    // Source registry errors
    NotFound,
    DuplicateName,
    NotDurable,

    // Source I/O errors
    SourceLoad,
    SaveFailed,
    Parse,
    Serialize,
    Io,
    InvalidPattern,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidPath => "INVALID_PATH",
            ErrorCode::MissingKeys => "MISSING_KEYS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::NotDurable => "NOT_DURABLE",
            ErrorCode::SourceLoad => "SOURCE_LOAD",
            ErrorCode::SaveFailed => "SAVE_FAILED",
            ErrorCode::Parse => "PARSE",
            ErrorCode::Serialize => "SERIALIZE",
            ErrorCode::Io => "IO",
            ErrorCode::InvalidPattern => "INVALID_PATTERN",
        };
        f.write_str(s)
    }
}

/// A single durable source that failed during `save()`.
#[derive(Debug)]
pub struct SourceFailure {
    pub name: String,
    pub cause: Error,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.cause)
    }
}

/// Errors surfaced by key paths, sources and the hierarchy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tried to descend through a scalar or sequence while setting a key.
    #[error("Cannot set '{key}': '{segment}' is not a mapping")]
    InvalidPath { key: String, segment: String },

    /// A registered source failed to produce a snapshot.
    #[error("Source '{name}' failed to load: {cause}")]
    SourceLoad {
        name: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("Source '{name}' is not durable and cannot be saved")]
    NotDurable { name: String },

    #[error("Source not found: {name}")]
    NotFound { name: String },

    #[error("Source already registered: {name}")]
    DuplicateName { name: String },

    #[error("Missing required keys: {}", .keys.join(", "))]
    MissingKeys { keys: Vec<String> },

    /// One or more durable sources could not be written. Sources not listed
    /// here were saved.
    #[error("Failed to save {} source(s): {}", .failures.len(), join_failures(.failures))]
    SaveFailed { failures: Vec<SourceFailure> },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize {}: {message}", .path.display())]
    Serialize { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidPath { .. } => ErrorCode::InvalidPath,
            Error::SourceLoad { .. } => ErrorCode::SourceLoad,
            Error::NotDurable { .. } => ErrorCode::NotDurable,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::DuplicateName { .. } => ErrorCode::DuplicateName,
            Error::MissingKeys { .. } => ErrorCode::MissingKeys,
            Error::SaveFailed { .. } => ErrorCode::SaveFailed,
            Error::Parse { .. } => ErrorCode::Parse,
            Error::Serialize { .. } => ErrorCode::Serialize,
            Error::Io { .. } => ErrorCode::Io,
            Error::InvalidPattern { .. } => ErrorCode::InvalidPattern,
        }
    }

    // Convenience constructors

    pub fn invalid_path(key: impl Into<String>, segment: impl Into<String>) -> Self {
        Error::InvalidPath {
            key: key.into(),
            segment: segment.into(),
        }
    }

    pub fn source_load(name: &str, cause: Error) -> Self {
        Error::SourceLoad {
            name: name.to_string(),
            cause: Box::new(cause),
        }
    }

    pub fn not_durable(name: &str) -> Self {
        Error::NotDurable {
            name: name.to_string(),
        }
    }

    pub fn not_found(name: &str) -> Self {
        Error::NotFound {
            name: name.to_string(),
        }
    }

    pub fn duplicate_name(name: &str) -> Self {
        Error::DuplicateName {
            name: name.to_string(),
        }
    }

    pub fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Error::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn serialize(path: &Path, err: impl fmt::Display) -> Self {
        Error::Serialize {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for hierarchy operations.
pub type Result<T> = std::result::Result<T, Error>;
