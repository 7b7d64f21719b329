//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Command needs a different source kind
    #[error("`{command}` requires a mock source, configuration has '{kind}'")]
    UnsupportedSource {
        command: &'static str,
        kind: &'static str,
    },

    /// Estimator state file could not be read or written
    #[error("State file {}: {source}", path.display())]
    StateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn state_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StateFile {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
