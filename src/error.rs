// src/error.rs

//! Error types for syspurpose operations

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the syspurpose library
#[derive(Debug, Error)]
pub enum Error {
    /// A file exists but does not hold a valid syspurpose JSON object
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Programmer error: bad conflict policy, empty key, wrong-typed field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// The consumer identity could not be determined
    #[error("Identity error: {0}")]
    Identity(String),

    /// Serializing contents for a write failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors a caller may recover from by treating contents as empty
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

/// Result type for syspurpose operations
pub type Result<T> = std::result::Result<T, Error>;
