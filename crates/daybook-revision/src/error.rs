//! Revision error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for revision store operations.
pub type RevisionResult<T> = Result<T, RevisionError>;

/// Result type for diff/patch operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by the diff codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// One or more hunks could not be located in the content.
    ///
    /// `best_effort` holds the text with every locatable hunk applied.
    #[error("{} of {total} patch hunks could not be applied", failed.len())]
    PatchApply {
        failed: Vec<usize>,
        total: usize,
        best_effort: String,
    },

    /// The on-disk patch text is malformed.
    #[error("malformed patch at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl CodecError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Errors that can occur while recording or reconstructing revisions.
#[derive(Debug, Error)]
pub enum RevisionError {
    /// A data directory path is occupied by a file, or is missing.
    #[error("Invalid data directory: {}", path.display())]
    InvalidDataDirectory { path: PathBuf },

    /// A reverse patch did not match the text it was applied to.
    #[error("could not reconstruct revision {timestamp}: {source}")]
    PatchApply {
        timestamp: i64,
        #[source]
        source: CodecError,
    },

    /// A stored revision payload could not be parsed.
    #[error("revision {timestamp} is corrupted: {source}")]
    Corrupted {
        timestamp: i64,
        #[source]
        source: CodecError,
    },

    /// Revision index outside the listed sequence.
    #[error("revision index {index} out of range ({count} revisions)")]
    RevisionNotFound { index: usize, count: usize },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RevisionError {
    pub fn invalid_data_dir(path: impl Into<PathBuf>) -> Self {
        Self::InvalidDataDirectory { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_data_dir_displays_path() {
        let err = RevisionError::invalid_data_dir("/journal/diffs/2024-03");
        assert_eq!(
            err.to_string(),
            "Invalid data directory: /journal/diffs/2024-03"
        );
    }

    #[test]
    fn patch_apply_counts_failed_hunks() {
        let err = CodecError::PatchApply {
            failed: vec![0, 2],
            total: 3,
            best_effort: String::new(),
        };
        assert_eq!(err.to_string(), "2 of 3 patch hunks could not be applied");
    }

    #[test]
    fn revision_not_found_displays_bounds() {
        let err = RevisionError::RevisionNotFound { index: 5, count: 3 };
        assert_eq!(err.to_string(), "revision index 5 out of range (3 revisions)");
    }
}
