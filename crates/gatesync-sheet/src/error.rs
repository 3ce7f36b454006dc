//! Error types for the gate-block document
//!
//! Validation errors (`InvalidTarget`, `EmptySelection`, `BlankCode`) are raised before any
//! row is touched. `MissingCatalogEntry` is never returned as `Err`; it is
//! reported as a warning in [`crate::ApplyReport`].

use std::path::PathBuf;

/// Document operation errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Row is not a gate header row
    #[error("invalid target row {row}: {reason}")]
    InvalidTarget {
        /// 1-based row index
        row: usize,
        /// Why the row was rejected
        reason: String,
    },

    /// No items were supplied
    #[error("empty selection: at least one standard is required")]
    EmptySelection,

    /// Item has no code, so its row would read as a blank spacer
    #[error("standard at position {index} has a blank code")]
    BlankCode {
        /// 0-based position in the submitted list
        index: usize,
    },

    /// Code could not be resolved against the catalog
    #[error("no catalog entry for '{code}'")]
    MissingCatalogEntry {
        /// Code or id that was looked up
        code: String,
    },

    /// Gate could not be located by number or title
    #[error("gate not found: {0}")]
    GateNotFound(String),

    /// IO error reading or writing a document file
    #[error("io error on {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document file is not valid JSON
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocumentError {
    /// Create invalid target error
    #[inline]
    pub fn invalid_target(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            row,
            reason: reason.into(),
        }
    }

    /// Create IO error for path
    #[inline]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Validation error raised by an editing operation (not retryable)
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget { .. }
                | Self::EmptySelection
                | Self::BlankCode { .. }
                | Self::MissingCatalogEntry { .. }
                | Self::GateNotFound(_)
        )
    }
}
