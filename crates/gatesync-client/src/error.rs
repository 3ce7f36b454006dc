//! Error types for the sync client
//!
//! Provides error handling for:
//! - Operations issued before a checklist context is set
//! - Key derivation, store and document failures
//! - Invalid sync configuration

use gatesync_sheet::DocumentError;
use gatesync_store::{KeyError, StoreError};

/// Sync client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No checklist context has been set
    #[error("no active checklist")]
    NoActiveChecklist,

    /// Checklist context did not produce a key
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Document write failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Create configuration error
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Document(DocumentError::Io { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_outage_is_retryable() {
        let err = ClientError::from(StoreError::unavailable("offline"));
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("store error"));
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        assert!(!ClientError::NoActiveChecklist.is_retryable());
        assert!(!ClientError::from(KeyError::EmptyComponent("gate id")).is_retryable());
        assert!(!ClientError::from(DocumentError::EmptySelection).is_retryable());
        assert!(!ClientError::config("zero attempts").is_retryable());
    }
}
