//! Error types for tgs.
//!
//! The library surfaces typed errors via thiserror; the binary wraps them
//! with anyhow context at the driver layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from building, loading, or searching an index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("{}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index corrupt: {0}")]
    Corrupt(String),

    #[error("config: {0}")]
    Config(String),
}

impl IndexError {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from query construction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("query must be at least 3 bytes, got {0}")]
    TooShort(usize),
}

/// Result type alias for index operations.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;
