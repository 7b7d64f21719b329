//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Malformed trace line
    #[error("failed to parse trace line {line}: {message}")]
    ParseFailed {
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },

    /// Trace file could not be read or written
    #[error("trace io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Event could not be encoded
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// Downstream receiver dropped
    #[error("channel closed for source {source_name}")]
    ChannelClosed {
        /// Source name
        source_name: String,
    },
}

impl IngestionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
