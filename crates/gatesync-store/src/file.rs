//! File-backed keyed store
//!
//! Durable [`KeyedStore`] persisting all entries of one user scope to a
//! single JSON file. The file is loaded once on open and written through on
//! every push (temp file + rename), so a crash never leaves a torn file.

use crate::error::StoreError;
use crate::store::{KeyedStore, Stamped, StoreEntry, Timestamp, WriteMode};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// JSON-file [`KeyedStore`]
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, StoreEntry>>,
}

impl FileStore {
    /// Open store at `path`, creating an empty one if the file does not exist
    ///
    /// # Errors
    /// - [`StoreError::Unavailable`] if the file cannot be read
    /// - [`StoreError::BadResponseShape`] if the file is not a valid store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::bad_shape(path.display().to_string(), e.to_string())
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::unavailable(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True if nothing has been written
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn persist(&self, entries: &BTreeMap<String, StoreEntry>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::unavailable(format!("creating {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::unavailable(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::unavailable(format!("renaming {}: {e}", tmp.display())))?;
        Ok(())
    }
}

#[async_trait]
impl KeyedStore for FileStore {
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).map_or_else(Stamped::empty, StoreEntry::stamped))
    }

    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).map_or(Timestamp::ZERO, |e| e.ts))
    }

    async fn push(
        &self,
        key: &str,
        value: Value,
        mode: WriteMode,
    ) -> Result<Timestamp, StoreError> {
        let mut entries = self.entries.lock().await;

        let entry = StoreEntry::written(entries.get(key), value, mode);
        let ts = entry.ts;
        let previous = entries.insert(key.to_string(), entry);

        // Roll the in-memory view back if the write-through fails
        if let Err(e) = self.persist(&entries).await {
            match previous {
                Some(prev) => {
                    entries.insert(key.to_string(), prev);
                }
                None => {
                    entries.remove(key);
                }
            }
            return Err(e);
        }

        tracing::trace!(key, %ts, path = %self.path.display(), "file store write");
        Ok(ts)
    }
}
