//! Sync client configuration
//!
//! Timing of the editor hand-off poll and of debounced writes. Loadable from
//! TOML; fields missing from the file keep their defaults.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Polling and debounce timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Timestamp checks after the editor opens
    pub poll_attempts: u32,
    /// Delay before each timestamp check, in milliseconds
    pub poll_interval_ms: u64,
    /// Delay before the single unconditional pull after a timeout
    pub final_retry_delay_ms: u64,
    /// Quiet period of debounced writes
    pub debounce_ms: u64,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With poll attempts
    #[inline]
    #[must_use]
    pub fn with_poll_attempts(mut self, attempts: u32) -> Self {
        self.poll_attempts = attempts;
        self
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// With final retry delay
    #[inline]
    #[must_use]
    pub fn with_final_retry_delay(mut self, delay: Duration) -> Self {
        self.final_retry_delay_ms = duration_ms(delay);
        self
    }

    /// With debounce quiet period
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debounce_ms = duration_ms(quiet);
        self
    }

    /// Poll interval
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Final retry delay
    #[inline]
    #[must_use]
    pub fn final_retry_delay(&self) -> Duration {
        Duration::from_millis(self.final_retry_delay_ms)
    }

    /// Debounce quiet period
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Worst-case time from opening the editor to the last pull
    #[must_use]
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval() * self.poll_attempts + self.final_retry_delay()
    }

    /// Reject configurations that would never poll
    ///
    /// # Errors
    /// [`ClientError::Config`] on zero attempts or a zero interval
    pub fn validate(self) -> Result<Self, ClientError> {
        if self.poll_attempts == 0 {
            return Err(ClientError::config("poll_attempts must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::config("poll_interval_ms must be positive"));
        }
        Ok(self)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// [`ClientError::Config`] if the text is not valid TOML or fails validation
    pub fn from_toml_str(text: &str) -> Result<Self, ClientError> {
        toml::from_str::<Self>(text)
            .map_err(|e| ClientError::config(e.to_string()))?
            .validate()
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// [`ClientError::Config`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 8,
            poll_interval_ms: 150,
            final_retry_delay_ms: 400,
            debounce_ms: 250,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
