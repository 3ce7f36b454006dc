//! Selection records
//!
//! [`SelectionStore`] keeps the ordered list of [`StandardRef`]s chosen for a
//! checklist. Every push is a full-list replace; there is no partial-list
//! merge, so callers always send the complete list.

use crate::error::StoreError;
use crate::key::{ChecklistContext, ChecklistKey};
use crate::record::StandardRef;
use crate::store::{SharedStore, Timestamp, WriteMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key namespace for selection records
pub const SELECTION_NAMESPACE: &str = "selection/";

/// Stored payload: the list plus the context it was written for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SelectionEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<ChecklistContext>,
    #[serde(default)]
    items: Vec<StandardRef>,
}

/// Selection list with the timestamp it was read at
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSnapshot {
    /// Items in insertion order
    pub items: Vec<StandardRef>,
    /// Context recorded by the last writer, if any
    pub context: Option<ChecklistContext>,
    /// Store timestamp
    pub ts: Timestamp,
}

/// Typed view over a [`crate::KeyedStore`] for selection lists
#[derive(Clone)]
pub struct SelectionStore {
    inner: SharedStore,
}

impl SelectionStore {
    /// Create selection view over a shared store
    #[inline]
    #[must_use]
    pub fn new(inner: SharedStore) -> Self {
        Self { inner }
    }

    fn storage_key(key: &ChecklistKey) -> String {
        format!("{SELECTION_NAMESPACE}{key}")
    }

    /// Read the list for `key`; unknown keys yield an empty list at ts 0
    ///
    /// # Errors
    /// - [`StoreError::Unavailable`] if the backend cannot be reached
    /// - [`StoreError::BadResponseShape`] if the stored payload is not a selection
    pub async fn pull(&self, key: &ChecklistKey) -> Result<SelectionSnapshot, StoreError> {
        let storage_key = Self::storage_key(key);
        let stamped = self.inner.pull(&storage_key).await?;

        let envelope = decode_envelope(&storage_key, stamped.value)?;
        Ok(SelectionSnapshot {
            items: envelope.items,
            context: envelope.context,
            ts: stamped.ts,
        })
    }

    /// Read only the timestamp for `key`
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    pub async fn timestamp(&self, key: &ChecklistKey) -> Result<Timestamp, StoreError> {
        self.inner.timestamp(&Self::storage_key(key)).await
    }

    /// Replace the full list for `key`
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    pub async fn push(
        &self,
        key: &ChecklistKey,
        context: Option<&ChecklistContext>,
        items: &[StandardRef],
    ) -> Result<Timestamp, StoreError> {
        let envelope = SelectionEnvelope {
            context: context.cloned(),
            items: items.to_vec(),
        };
        let value = serde_json::to_value(&envelope)?;

        let ts = self
            .inner
            .push(&Self::storage_key(key), value, WriteMode::Replace)
            .await?;
        tracing::debug!(%key, %ts, items = items.len(), "selection pushed");
        Ok(ts)
    }
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore").finish_non_exhaustive()
    }
}

fn decode_envelope(storage_key: &str, value: Value) -> Result<SelectionEnvelope, StoreError> {
    match value {
        Value::Null => Ok(SelectionEnvelope {
            context: None,
            items: Vec::new(),
        }),
        // Bare arrays are accepted for payloads written without an envelope
        Value::Array(_) => serde_json::from_value(value)
            .map(|items| SelectionEnvelope {
                context: None,
                items,
            })
            .map_err(|e| StoreError::bad_shape(storage_key, e.to_string())),
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| StoreError::bad_shape(storage_key, e.to_string())),
        other => Err(StoreError::bad_shape(
            storage_key,
            format!("expected selection list, found {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::KeyedStore;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, SelectionStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = SelectionStore::new(backend.clone());
        (backend, store)
    }

    fn key() -> ChecklistKey {
        ChecklistKey::derive("1", "Intake").unwrap()
    }

    #[tokio::test]
    async fn unknown_key_is_empty_list() {
        let (_, store) = setup();
        let snapshot = store.pull(&key()).await.unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.ts, Timestamp::ZERO);
    }

    #[tokio::test]
    async fn round_trip_preserves_order_and_duplicates() {
        let (_, store) = setup();
        let items = vec![
            StandardRef::new("B-2", "second", 20.0),
            StandardRef::new("A-1", "first", 57.5),
            StandardRef::new("B-2", "second again", 0.0),
        ];
        let ctx = ChecklistContext::new("1", "Intake");

        store.push(&key(), Some(&ctx), &items).await.unwrap();
        let snapshot = store.pull(&key()).await.unwrap();

        assert_eq!(snapshot.items, items);
        assert_eq!(snapshot.context, Some(ctx));
    }

    #[tokio::test]
    async fn push_replaces_whole_list() {
        let (_, store) = setup();
        store
            .push(&key(), None, &[StandardRef::new("A", "", 10.0), StandardRef::new("B", "", 20.0)])
            .await
            .unwrap();
        store.push(&key(), None, &[StandardRef::new("C", "", 30.0)]).await.unwrap();

        let snapshot = store.pull(&key()).await.unwrap();
        assert_eq!(snapshot.items, vec![StandardRef::new("C", "", 30.0)]);
        assert_eq!(snapshot.ts, Timestamp(2));
    }

    #[tokio::test]
    async fn bare_array_payload_decodes() {
        let (backend, store) = setup();
        backend
            .push(
                "selection/1::Intake",
                json!([{"code": "X", "percent": "150"}]),
                WriteMode::Replace,
            )
            .await
            .unwrap();

        let snapshot = store.pull(&key()).await.unwrap();
        assert_eq!(snapshot.items, vec![StandardRef::new("X", "", 100.0)]);
    }

    #[tokio::test]
    async fn scalar_payload_is_bad_shape() {
        let (backend, store) = setup();
        backend
            .push("selection/1::Intake", json!("oops"), WriteMode::Replace)
            .await
            .unwrap();

        let err = store.pull(&key()).await.unwrap_err();
        assert!(matches!(err, StoreError::BadResponseShape { .. }));
    }
}
