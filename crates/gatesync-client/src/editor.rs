//! Modal standards editor
//!
//! The editor receives a key and context when it opens, edits its own copy
//! of the list and writes it back with a single full-list replace. It knows
//! nothing about the panel or its poller.

use crate::error::ClientError;
use gatesync_store::{ChecklistContext, ChecklistKey, SelectionStore, StandardRef, Timestamp};
use tracing::debug;

/// What the panel hands to the editor when opening it
#[derive(Debug, Clone, PartialEq)]
pub struct EditorRequest {
    /// Key the editor writes under
    pub key: ChecklistKey,
    /// Context recorded alongside the list
    pub context: ChecklistContext,
    /// Panel's list at the time of opening
    pub items: Vec<StandardRef>,
}

/// Opens the editor surface; fire-and-forget
///
/// Implementations must return promptly. The panel learns about the result
/// only through the store.
pub trait EditorLauncher: Send + Sync {
    /// Open the editor for `request`
    fn launch(&self, request: EditorRequest);
}

/// Launcher that never opens anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLauncher;

impl EditorLauncher for NoopLauncher {
    fn launch(&self, request: EditorRequest) {
        debug!(key = %request.key, "Editor launch ignored");
    }
}

/// Working state of one open editor
#[derive(Debug)]
pub struct EditorSurface {
    key: ChecklistKey,
    context: ChecklistContext,
    items: Vec<StandardRef>,
    store: SelectionStore,
}

impl EditorSurface {
    /// Open a surface seeded with the request's list
    #[must_use]
    pub fn open(store: SelectionStore, request: EditorRequest) -> Self {
        debug!(key = %request.key, items = request.items.len(), "Editor opened");
        Self {
            key: request.key,
            context: request.context,
            items: request.items,
            store,
        }
    }

    /// Open a surface seeded with the list currently in the store
    ///
    /// # Errors
    /// - [`ClientError::Key`] if the context has an empty component
    /// - [`ClientError::Store`] if the list cannot be read
    pub async fn load(store: SelectionStore, context: ChecklistContext) -> Result<Self, ClientError> {
        let key = context.key()?;
        let snapshot = store.pull(&key).await?;
        Ok(Self::open(
            store,
            EditorRequest {
                key,
                context,
                items: snapshot.items,
            },
        ))
    }

    /// Key this surface writes under
    #[inline]
    #[must_use]
    pub fn key(&self) -> &ChecklistKey {
        &self.key
    }

    /// Working list
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[StandardRef] {
        &self.items
    }

    /// Append a standard
    pub fn add(&mut self, item: StandardRef) {
        self.items.push(item);
    }

    /// Remove the standard at `index`
    pub fn remove(&mut self, index: usize) -> Option<StandardRef> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Set the percentage of the standard at `index` (clamped); false if out of range
    pub fn set_percent(&mut self, index: usize, percent: f64) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.set_percent(percent);
                true
            }
            None => false,
        }
    }

    /// Write the working list with one full replace and close
    ///
    /// # Errors
    /// [`ClientError::Store`] if the write fails; the surface is closed either way
    pub async fn submit(self) -> Result<Timestamp, ClientError> {
        let ts = self
            .store
            .push(&self.key, Some(&self.context), &self.items)
            .await?;
        debug!(key = %self.key, %ts, items = self.items.len(), "Editor submitted");
        Ok(ts)
    }

    /// Close without writing
    pub fn cancel(self) {
        debug!(key = %self.key, "Editor cancelled");
    }
}
