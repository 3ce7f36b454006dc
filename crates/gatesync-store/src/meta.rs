//! Checklist metadata records
//!
//! [`MetaStore`] keeps status, assignee, due date and feedback per checklist.
//! Pushes are partial: only fields set in the patch are written, the rest is
//! preserved by the store's merge mode.

use crate::error::StoreError;
use crate::key::ChecklistKey;
use crate::record::{ChecklistMeta, ChecklistMetaPatch};
use crate::store::{SharedStore, Timestamp, WriteMode};
use serde_json::Value;

/// Key namespace for metadata records
pub const META_NAMESPACE: &str = "meta/";

/// Typed view over a [`crate::KeyedStore`] for checklist metadata
#[derive(Clone)]
pub struct MetaStore {
    inner: SharedStore,
}

impl MetaStore {
    /// Create metadata view over a shared store
    #[inline]
    #[must_use]
    pub fn new(inner: SharedStore) -> Self {
        Self { inner }
    }

    fn storage_key(key: &ChecklistKey) -> String {
        format!("{META_NAMESPACE}{key}")
    }

    /// Read metadata for `key`; unknown keys yield the default record
    ///
    /// # Errors
    /// - [`StoreError::Unavailable`] if the backend cannot be reached
    /// - [`StoreError::BadResponseShape`] if the stored value is not an object
    pub async fn pull(&self, key: &ChecklistKey) -> Result<(ChecklistMeta, Timestamp), StoreError> {
        let storage_key = Self::storage_key(key);
        let stamped = self.inner.pull(&storage_key).await?;

        let meta = match stamped.value {
            Value::Null => ChecklistMeta::default(),
            value @ Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| StoreError::bad_shape(&storage_key, e.to_string()))?,
            other => {
                return Err(StoreError::bad_shape(
                    storage_key,
                    format!("expected metadata object, found {other}"),
                ))
            }
        };
        Ok((meta, stamped.ts))
    }

    /// Merge `patch` into the stored record
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the backend cannot be reached
    pub async fn push(
        &self,
        key: &ChecklistKey,
        patch: &ChecklistMetaPatch,
    ) -> Result<Timestamp, StoreError> {
        let value = serde_json::to_value(patch)?;
        let ts = self
            .inner
            .push(&Self::storage_key(key), value, WriteMode::Merge)
            .await?;
        tracing::debug!(%key, %ts, "checklist meta pushed");
        Ok(ts)
    }
}

impl std::fmt::Debug for MetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::record::ChecklistStatus;
    use std::sync::Arc;

    fn key() -> ChecklistKey {
        ChecklistKey::derive("2", "Design Review").unwrap()
    }

    #[tokio::test]
    async fn unknown_key_is_default_meta() {
        let store = MetaStore::new(Arc::new(MemoryStore::new()));
        let (meta, ts) = store.pull(&key()).await.unwrap();
        assert_eq!(meta, ChecklistMeta::default());
        assert_eq!(ts, Timestamp::ZERO);
    }

    #[tokio::test]
    async fn partial_pushes_merge_field_by_field() {
        let store = MetaStore::new(Arc::new(MemoryStore::new()));

        store
            .push(
                &key(),
                &ChecklistMetaPatch::new()
                    .with_status(ChecklistStatus::PendingApproval)
                    .with_assignee("kim"),
            )
            .await
            .unwrap();
        store
            .push(&key(), &ChecklistMetaPatch::new().with_due_date("2026-12-01"))
            .await
            .unwrap();
        let ts = store
            .push(&key(), &ChecklistMetaPatch::new().with_status(ChecklistStatus::Approved))
            .await
            .unwrap();

        let (meta, pulled_ts) = store.pull(&key()).await.unwrap();
        assert_eq!(meta.status, ChecklistStatus::Approved);
        assert_eq!(meta.assignee, "kim");
        assert_eq!(meta.due_date, "2026-12-01");
        assert_eq!(meta.feedback, "");
        assert_eq!(pulled_ts, ts);
    }
}
