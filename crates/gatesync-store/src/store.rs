//! Keyed store contract
//!
//! A [`KeyedStore`] maps opaque string keys to JSON values plus a per-key
//! [`Timestamp`] that the store bumps on every successful write. The
//! timestamp is the only ordering signal the two UI surfaces share.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Per-key write counter (0 = never written)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Timestamp of a key that was never written
    pub const ZERO: Self = Self(0);

    /// Next timestamp after a write
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a push combines with the stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Shallow field-wise merge of JSON objects
    Merge,
    /// Overwrite wholesale
    #[default]
    Replace,
}

/// Value read from the store with its timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped {
    /// Stored value (`null` for unknown keys)
    pub value: Value,
    /// Timestamp of the last write (0 for unknown keys)
    pub ts: Timestamp,
}

impl Stamped {
    /// Defined-empty result for a key that was never written
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: Value::Null,
            ts: Timestamp::ZERO,
        }
    }

    /// True if the key was never written
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ts == Timestamp::ZERO
    }
}

/// Stored entry as kept by the bundled backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Current value
    pub value: Value,
    /// Write counter
    pub ts: Timestamp,
    /// Wall-clock time of the last write (diagnostics only)
    pub updated_at: DateTime<Utc>,
}

impl StoreEntry {
    /// Produce the entry that results from writing `value` on top of `previous`
    #[must_use]
    pub fn written(previous: Option<&StoreEntry>, value: Value, mode: WriteMode) -> Self {
        let (value, ts) = match previous {
            Some(prev) => (combine(&prev.value, value, mode), prev.ts.next()),
            None => (value, Timestamp::ZERO.next()),
        };
        Self {
            value,
            ts,
            updated_at: Utc::now(),
        }
    }

    /// Read view of this entry
    #[inline]
    #[must_use]
    pub fn stamped(&self) -> Stamped {
        Stamped {
            value: self.value.clone(),
            ts: self.ts,
        }
    }
}

/// Combine an existing value with an incoming one under `mode`
///
/// `Merge` only merges when both sides are JSON objects; any other
/// combination falls back to replacing.
#[must_use]
pub fn combine(existing: &Value, incoming: Value, mode: WriteMode) -> Value {
    match (mode, existing, incoming) {
        (WriteMode::Merge, Value::Object(current), Value::Object(patch)) => {
            let mut merged = current.clone();
            for (field, value) in patch {
                merged.insert(field, value);
            }
            Value::Object(merged)
        }
        (_, _, incoming) => incoming,
    }
}

/// Durable keyed store with per-key timestamps
///
/// Scoped to a single end-user; see [`crate::ScopedStore`] for sharing one
/// backend between users.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Read value and timestamp; unknown keys yield [`Stamped::empty`]
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError>;

    /// Read only the timestamp
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        Ok(self.pull(key).await?.ts)
    }

    /// Write value; bumps the key's timestamp by at least one
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    async fn push(&self, key: &str, value: Value, mode: WriteMode)
        -> Result<Timestamp, StoreError>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn KeyedStore>;

#[async_trait]
impl<S: KeyedStore + ?Sized> KeyedStore for Arc<S> {
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError> {
        (**self).pull(key).await
    }

    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        (**self).timestamp(key).await
    }

    async fn push(
        &self,
        key: &str,
        value: Value,
        mode: WriteMode,
    ) -> Result<Timestamp, StoreError> {
        (**self).push(key, value, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_combines_objects() {
        let merged = combine(
            &json!({"status": "Approved", "assignee": "kim"}),
            json!({"assignee": "lee"}),
            WriteMode::Merge,
        );
        assert_eq!(merged, json!({"status": "Approved", "assignee": "lee"}));
    }

    #[test]
    fn merge_on_non_objects_replaces() {
        let merged = combine(&json!([1, 2, 3]), json!([4]), WriteMode::Merge);
        assert_eq!(merged, json!([4]));
    }

    #[test]
    fn replace_overwrites_objects() {
        let replaced = combine(&json!({"a": 1, "b": 2}), json!({"a": 3}), WriteMode::Replace);
        assert_eq!(replaced, json!({"a": 3}));
    }

    #[test]
    fn first_write_starts_at_one() {
        let entry = StoreEntry::written(None, json!(1), WriteMode::Replace);
        assert_eq!(entry.ts, Timestamp(1));

        let next = StoreEntry::written(Some(&entry), json!(1), WriteMode::Replace);
        assert_eq!(next.ts, Timestamp(2));
        assert_eq!(next.value, json!(1));
    }

    #[test]
    fn write_mode_wire_names() {
        assert_eq!(serde_json::to_value(WriteMode::Merge).unwrap(), json!("merge"));
        let mode: WriteMode = serde_json::from_value(json!("replace")).unwrap();
        assert_eq!(mode, WriteMode::Replace);
    }
}
