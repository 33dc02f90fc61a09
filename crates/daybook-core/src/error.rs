//! Error types for the core crate.

use daybook_revision::RevisionError;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Recording or reconstructing revisions failed.
    #[error(transparent)]
    Revision(#[from] RevisionError),

    /// The external editor could not be started.
    #[error("failed to launch editor '{command}': {source}")]
    EditorLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// Explicitly requested config file does not exist.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// File reference not found during substitution.
    #[error("file reference not found: {path}")]
    FileRefNotFound { path: String },

    /// Invalid path (e.g., could not determine data directory).
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_errors_pass_through() {
        let err: CoreError = RevisionError::invalid_data_dir("/j/diffs/2024-03").into();
        assert_eq!(err.to_string(), "Invalid data directory: /j/diffs/2024-03");
    }

    #[test]
    fn config_errors_are_prefixed() {
        let err: CoreError = ConfigError::EnvVarNotFound {
            name: "JOURNAL".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "config error: environment variable not found: JOURNAL"
        );
    }
}
