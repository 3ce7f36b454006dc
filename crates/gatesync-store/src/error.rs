//! Error types for the keyed store
//!
//! Provides error handling for:
//! - Persistence failures (store unreachable)
//! - Payloads that do not decode into the expected record shape
//! - Key derivation from checklist context

/// Store operation errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying persistence layer is unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored or returned payload has an unexpected shape
    #[error("unexpected payload shape for '{key}': {message}")]
    BadResponseShape {
        /// Key whose payload failed to decode
        key: String,
        /// Decoder message
        message: String,
    },

    /// Value could not be encoded as JSON
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create unavailable error
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create bad response shape error for key
    #[inline]
    pub fn bad_shape(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadResponseShape {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Transient infrastructure failure (callers may try again on a later cycle)
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Checklist key derivation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// A key component was empty after trimming
    #[error("empty key component: {0}")]
    EmptyComponent(&'static str),

    /// Gate id contains the key delimiter, so the key would not split back
    #[error("gate id '{0}' contains the key delimiter")]
    DelimiterInGate(String),
}
