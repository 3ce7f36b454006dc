//! In-process keyed store
//!
//! Concurrent map of entries with an availability switch so callers can
//! exercise their outage handling without a real backend.

use crate::error::StoreError;
use crate::store::{KeyedStore, Stamped, StoreEntry, Timestamp, WriteMode};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Statistics for store monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys ever written
    pub entry_count: usize,
}

/// In-memory [`KeyedStore`]
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, StoreEntry>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability; while unavailable every call fails with
    /// [`StoreError::Unavailable`]
    #[inline]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current availability
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Get store statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entry_count: self.entries.len(),
        }
    }

    /// Raw entry for a key (diagnostics)
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<StoreEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory store switched off"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError> {
        self.ensure_available()?;
        Ok(self
            .entries
            .get(key)
            .map_or_else(Stamped::empty, |e| e.stamped()))
    }

    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        self.ensure_available()?;
        Ok(self.entries.get(key).map_or(Timestamp::ZERO, |e| e.ts))
    }

    async fn push(
        &self,
        key: &str,
        value: Value,
        mode: WriteMode,
    ) -> Result<Timestamp, StoreError> {
        self.ensure_available()?;

        // The entry guard serializes concurrent writers on the same key
        let mut slot = self.entries.entry(key.to_string()).or_insert_with(|| StoreEntry {
            value: Value::Null,
            ts: Timestamp::ZERO,
            updated_at: chrono::Utc::now(),
        });
        let previous = (slot.ts != Timestamp::ZERO).then(|| slot.clone());
        *slot = StoreEntry::written(previous.as_ref(), value, mode);
        let ts = slot.ts;
        drop(slot);

        tracing::trace!(key, %ts, "memory store write");
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_key_is_empty() {
        let store = MemoryStore::new();
        let pulled = store.pull("nope").await.unwrap();
        assert!(pulled.is_empty());
        assert_eq!(pulled.value, Value::Null);
        assert_eq!(store.timestamp("nope").await.unwrap(), Timestamp::ZERO);
    }

    #[tokio::test]
    async fn push_then_pull_round_trips() {
        let store = MemoryStore::new();
        let value = json!([{"code": "A", "description": "", "percent": 10.0}]);

        let ts = store.push("k", value.clone(), WriteMode::Replace).await.unwrap();
        let pulled = store.pull("k").await.unwrap();

        assert_eq!(pulled.value, value);
        assert_eq!(pulled.ts, ts);
        assert_eq!(store.stats().entry_count, 1);
    }

    #[tokio::test]
    async fn identical_pushes_still_bump_timestamp() {
        let store = MemoryStore::new();
        let first = store.push("k", json!(1), WriteMode::Replace).await.unwrap();
        let second = store.push("k", json!(1), WriteMode::Replace).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn merge_preserves_absent_fields() {
        let store = MemoryStore::new();
        store
            .push("m", json!({"status": "Approved", "assignee": "kim"}), WriteMode::Merge)
            .await
            .unwrap();
        store
            .push("m", json!({"feedback": "ok"}), WriteMode::Merge)
            .await
            .unwrap();

        let pulled = store.pull("m").await.unwrap();
        assert_eq!(
            pulled.value,
            json!({"status": "Approved", "assignee": "kim", "feedback": "ok"})
        );
        assert_eq!(pulled.ts, Timestamp(2));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(store.pull("k").await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.push("k", json!(1), WriteMode::Replace).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert!(store.pull("k").await.is_ok());
    }
}
