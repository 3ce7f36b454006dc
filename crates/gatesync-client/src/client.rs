//! Panel-side synchronization client
//!
//! Provides:
//! - Active checklist context and its derived key
//! - Editor hand-off with bounded timestamp polling
//! - Debounced write-back of local edits (list and per-field metadata)
//! - A `watch` channel carrying the panel view for the renderer
//! - Block replace into the document after every pull
//!
//! Store failures never escape this boundary: they are logged and the local
//! view is left as it was.

use crate::config::SyncConfig;
use crate::debounce::{Debouncer, FlushFn};
use crate::editor::{EditorLauncher, EditorRequest, NoopLauncher};
use crate::error::ClientError;
use crate::poll::{PollHandle, PollOutcome, PollState};
use async_trait::async_trait;
use futures::FutureExt;
use gatesync_sheet::{SharedDocument, StandardCatalog};
use gatesync_store::{
    ChecklistContext, ChecklistKey, ChecklistMeta, ChecklistMetaPatch, MetaField, MetaStore,
    SelectionStore, SharedStore, StandardRef, Timestamp,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// What the panel renders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelView {
    /// Active context
    pub context: Option<ChecklistContext>,
    /// Active key
    pub key: Option<ChecklistKey>,
    /// Standards in order
    pub items: Vec<StandardRef>,
    /// Checklist metadata
    pub meta: ChecklistMeta,
    /// Store timestamp of the last applied pull
    pub ts: Timestamp,
    /// Editor hand-off state
    pub sync: PollState,
}

/// Receives the full list after every pull or flushed local edit
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Replace the data run of the block for `context`
    async fn replace_block(
        &self,
        context: &ChecklistContext,
        items: &[StandardRef],
    ) -> Result<(), ClientError>;
}

/// [`DocumentSink`] writing into a shared [`gatesync_sheet::BlockDocument`]
pub struct BlockDocumentSink {
    document: SharedDocument,
    catalog: Arc<StandardCatalog>,
    path: Option<PathBuf>,
}

impl BlockDocumentSink {
    /// Create sink over a shared document
    #[must_use]
    pub fn new(document: SharedDocument, catalog: Arc<StandardCatalog>) -> Self {
        Self {
            document,
            catalog,
            path: None,
        }
    }

    /// Save the document to `path` after each write
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[async_trait]
impl DocumentSink for BlockDocumentSink {
    async fn replace_block(
        &self,
        context: &ChecklistContext,
        items: &[StandardRef],
    ) -> Result<(), ClientError> {
        let coded: Vec<StandardRef> = items
            .iter()
            .filter(|item| !item.code.trim().is_empty())
            .cloned()
            .collect();
        if coded.len() < items.len() {
            warn!(
                gate = %context.gate_id,
                skipped = items.len() - coded.len(),
                "Skipping standards without a code"
            );
        }

        let mut document = self.document.lock();
        let header_row = document.find_checklist(&context.gate_id, &context.checklist_title)?;
        let report = document.replace_selection(header_row, &coded, &self.catalog)?;
        if let Some(path) = &self.path {
            document.save(path)?;
        }
        debug!(
            gate = %context.gate_id,
            checklist = %context.checklist_title,
            header_row,
            rows = report.rows_written,
            "Replaced document block"
        );
        Ok(())
    }
}

impl std::fmt::Debug for BlockDocumentSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDocumentSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct SelectionWrite {
    context: ChecklistContext,
    items: Vec<StandardRef>,
}

struct Shared {
    selections: SelectionStore,
    launcher: Arc<dyn EditorLauncher>,
    sink: Option<Arc<dyn DocumentSink>>,
    config: SyncConfig,
    view: watch::Sender<PanelView>,
    generation: AtomicU64,
    poll: Mutex<Option<AbortHandle>>,
}

impl Shared {
    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Start a new generation and abort the running poll
    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.poll.lock().take() {
            previous.abort();
            debug!(generation, "Superseded running poll");
        }
        generation
    }

    fn set_sync(&self, generation: u64, state: PollState) {
        if self.is_current(generation) {
            self.view.send_modify(|view| view.sync = state);
        }
    }

    /// Pull the list and apply it if `generation` is still current
    async fn pull_selection(
        &self,
        key: &ChecklistKey,
        context: &ChecklistContext,
        generation: u64,
    ) -> bool {
        let snapshot = match self.selections.pull(key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(%key, error = %e, "Selection pull failed, keeping local state");
                return false;
            }
        };
        if !self.is_current(generation) {
            debug!(%key, "Discarding pull for superseded generation");
            return false;
        }

        let items = snapshot.items.clone();
        self.view.send_modify(|view| {
            view.items = snapshot.items;
            view.ts = snapshot.ts;
        });

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.replace_block(context, &items).await {
                warn!(%key, error = %e, "Document block replace failed");
            }
        }
        true
    }

    async fn run_poll(
        self: Arc<Self>,
        key: ChecklistKey,
        context: ChecklistContext,
        generation: u64,
        baseline: Timestamp,
    ) -> PollOutcome {
        let attempts = self.config.poll_attempts;

        for attempt in 1..=attempts {
            tokio::time::sleep(self.config.poll_interval()).await;
            if !self.is_current(generation) {
                return PollOutcome::superseded(baseline, attempt - 1);
            }

            match self.selections.timestamp(&key).await {
                Ok(ts) if ts > baseline => {
                    self.pull_selection(&key, &context, generation).await;
                    if !self.is_current(generation) {
                        return PollOutcome::superseded(baseline, attempt);
                    }
                    self.set_sync(generation, PollState::Converged);
                    info!(%key, attempt, %ts, "Converged on editor write");
                    return PollOutcome {
                        state: PollState::Converged,
                        attempts: attempt,
                        baseline,
                        observed: Some(ts),
                    };
                }
                Ok(ts) => debug!(%key, attempt, %ts, "No editor write yet"),
                Err(e) => warn!(%key, attempt, error = %e, "Timestamp poll failed"),
            }
        }

        self.set_sync(generation, PollState::TimedOut);
        tokio::time::sleep(self.config.final_retry_delay()).await;
        if !self.is_current(generation) {
            return PollOutcome::superseded(baseline, attempts);
        }
        self.pull_selection(&key, &context, generation).await;
        info!(%key, attempts, "No editor write observed, pulled once after timeout");

        PollOutcome {
            state: PollState::TimedOut,
            attempts,
            baseline,
            observed: None,
        }
    }
}

/// Builder for [`SyncClient`]
pub struct SyncClientBuilder {
    store: SharedStore,
    launcher: Arc<dyn EditorLauncher>,
    sink: Option<Arc<dyn DocumentSink>>,
    config: SyncConfig,
}

impl SyncClientBuilder {
    /// With editor launcher
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn EditorLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// With document sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DocumentSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// With timing configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// [`ClientError::Config`] if the configuration is rejected
    pub fn build(self) -> Result<SyncClient, ClientError> {
        let config = self.config.validate()?;
        let selections = SelectionStore::new(Arc::clone(&self.store));
        let meta = MetaStore::new(self.store);

        let selection_writes = Debouncer::new(
            config.debounce(),
            selection_flush(selections.clone(), self.sink.clone()),
        );
        let meta_writes = Debouncer::new(config.debounce(), meta_flush(meta.clone()));
        let (view, _) = watch::channel(PanelView::default());

        Ok(SyncClient {
            shared: Arc::new(Shared {
                selections,
                launcher: self.launcher,
                sink: self.sink,
                config,
                view,
                generation: AtomicU64::new(0),
                poll: Mutex::new(None),
            }),
            meta,
            selection_writes,
            meta_writes,
        })
    }
}

fn selection_flush(
    selections: SelectionStore,
    sink: Option<Arc<dyn DocumentSink>>,
) -> FlushFn<ChecklistKey, SelectionWrite> {
    Arc::new(move |key: ChecklistKey, write: SelectionWrite| {
        let selections = selections.clone();
        let sink = sink.clone();
        async move {
            match selections.push(&key, Some(&write.context), &write.items).await {
                Ok(ts) => {
                    debug!(%key, %ts, items = write.items.len(), "Flushed selection edit");
                    if let Some(sink) = sink {
                        if let Err(e) = sink.replace_block(&write.context, &write.items).await {
                            warn!(%key, error = %e, "Document block replace failed");
                        }
                    }
                }
                Err(e) => warn!(%key, error = %e, "Selection write failed"),
            }
        }
        .boxed()
    })
}

fn meta_flush(meta: MetaStore) -> FlushFn<(ChecklistKey, MetaField), String> {
    Arc::new(move |(key, field): (ChecklistKey, MetaField), value: String| {
        let meta = meta.clone();
        async move {
            let patch = ChecklistMetaPatch::field(field, value);
            match meta.push(&key, &patch).await {
                Ok(ts) => debug!(%key, ?field, %ts, "Flushed metadata edit"),
                Err(e) => warn!(%key, ?field, error = %e, "Metadata write failed"),
            }
        }
        .boxed()
    })
}

/// Panel-side client for one end user
pub struct SyncClient {
    shared: Arc<Shared>,
    meta: MetaStore,
    selection_writes: Debouncer<ChecklistKey, SelectionWrite>,
    meta_writes: Debouncer<(ChecklistKey, MetaField), String>,
}

impl SyncClient {
    /// Start building a client over `store`
    #[must_use]
    pub fn builder(store: SharedStore) -> SyncClientBuilder {
        SyncClientBuilder {
            store,
            launcher: Arc::new(NoopLauncher),
            sink: None,
            config: SyncConfig::default(),
        }
    }

    /// Timing configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Current panel view
    #[must_use]
    pub fn view(&self) -> PanelView {
        self.shared.view.borrow().clone()
    }

    /// Receiver notified on every view change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PanelView> {
        self.shared.view.subscribe()
    }

    /// Current hand-off state
    #[must_use]
    pub fn poll_state(&self) -> PollState {
        self.shared.view.borrow().sync
    }

    /// Active key, if a context is set
    #[must_use]
    pub fn active_key(&self) -> Option<ChecklistKey> {
        self.shared.view.borrow().key.clone()
    }

    /// Debounced writes not yet flushed
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.selection_writes.pending() + self.meta_writes.pending()
    }

    fn active(&self) -> Result<(ChecklistKey, ChecklistContext), ClientError> {
        let view = self.shared.view.borrow();
        match (&view.key, &view.context) {
            (Some(key), Some(context)) => Ok((key.clone(), context.clone())),
            _ => Err(ClientError::NoActiveChecklist),
        }
    }

    /// Switch to `context` and pull its state
    ///
    /// Pending writes of the previous key are flushed first and any running
    /// poll is superseded.
    ///
    /// # Errors
    /// [`ClientError::Key`] if the context has an empty component
    pub async fn set_context(&self, context: ChecklistContext) -> Result<ChecklistKey, ClientError> {
        let key = context.key()?;

        let flushed = self.flush().await;
        let generation = self.shared.supersede();
        self.shared.view.send_modify(|view| {
            *view = PanelView {
                context: Some(context),
                key: Some(key.clone()),
                ..PanelView::default()
            };
        });
        debug!(%key, generation, flushed, "Active checklist changed");

        self.refresh().await?;
        Ok(key)
    }

    /// Re-pull list and metadata for the active key now
    ///
    /// # Errors
    /// [`ClientError::NoActiveChecklist`] if no context is set
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let (key, context) = self.active()?;
        self.selection_writes.flush_now(&key).await;

        let generation = self.shared.current_generation();
        self.shared.pull_selection(&key, &context, generation).await;

        match self.meta.pull(&key).await {
            Ok((meta, _)) if self.shared.is_current(generation) => {
                self.shared.view.send_modify(|view| view.meta = meta);
            }
            Ok(_) => debug!(%key, "Discarding metadata pull for superseded generation"),
            Err(e) => warn!(%key, error = %e, "Metadata pull failed, keeping local state"),
        }
        Ok(())
    }

    /// Open the editor for the active key and start polling for its write
    ///
    /// The launcher is called fire-and-forget. The returned handle resolves
    /// when the loop converges, times out, or is superseded.
    ///
    /// # Errors
    /// [`ClientError::NoActiveChecklist`] if no context is set
    pub async fn open_editor(&self) -> Result<PollHandle, ClientError> {
        let (key, context) = self.active()?;

        // Own pending or in-flight edits must not look like the editor's write
        self.selection_writes.flush_now(&key).await;

        let generation = self.shared.supersede();
        let baseline = match self.shared.selections.timestamp(&key).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!(%key, error = %e, "Baseline read failed, using last known timestamp");
                self.shared.view.borrow().ts
            }
        };

        let items = self.shared.view.borrow().items.clone();
        self.shared.launcher.launch(EditorRequest {
            key: key.clone(),
            context: context.clone(),
            items,
        });
        self.shared.set_sync(generation, PollState::Polling);
        info!(%key, %baseline, "Editor opened, polling for its write");

        let poll = Arc::clone(&self.shared).run_poll(key, context, generation, baseline);
        let task = tokio::spawn(poll);
        if let Some(stale) = self.shared.poll.lock().replace(task.abort_handle()) {
            stale.abort();
        }
        Ok(PollHandle::new(baseline, task))
    }

    /// Set the percentage of the standard at `index`; false if out of range
    ///
    /// The full list is written back after the debounce quiet period.
    ///
    /// # Errors
    /// [`ClientError::NoActiveChecklist`] if no context is set
    pub fn set_percent(&self, index: usize, percent: f64) -> Result<bool, ClientError> {
        let (key, context) = self.active()?;
        let mut updated = None;
        self.shared.view.send_if_modified(|view| match view.items.get_mut(index) {
            Some(item) => {
                item.set_percent(percent);
                updated = Some(view.items.clone());
                true
            }
            None => false,
        });

        let Some(items) = updated else {
            debug!(%key, index, "Percent edit out of range");
            return Ok(false);
        };
        self.selection_writes.schedule(key, SelectionWrite { context, items });
        Ok(true)
    }

    /// Remove the standard at `index`
    ///
    /// The full list is written back after the debounce quiet period.
    ///
    /// # Errors
    /// [`ClientError::NoActiveChecklist`] if no context is set
    pub fn remove_standard(&self, index: usize) -> Result<Option<StandardRef>, ClientError> {
        let (key, context) = self.active()?;
        let mut removed = None;
        let mut remaining = Vec::new();
        self.shared.view.send_if_modified(|view| {
            if index >= view.items.len() {
                return false;
            }
            removed = Some(view.items.remove(index));
            remaining.clone_from(&view.items);
            true
        });

        if removed.is_some() {
            self.selection_writes.schedule(
                key,
                SelectionWrite {
                    context,
                    items: remaining,
                },
            );
        }
        Ok(removed)
    }

    /// Edit one metadata field
    ///
    /// Applied locally at once and written back as a single-field merge
    /// after a quiet period kept separately per field.
    ///
    /// # Errors
    /// [`ClientError::NoActiveChecklist`] if no context is set
    pub fn update_meta(&self, field: MetaField, value: impl Into<String>) -> Result<(), ClientError> {
        let (key, _) = self.active()?;
        let value = value.into();
        let patch = ChecklistMetaPatch::field(field, value.clone());
        self.shared.view.send_modify(|view| view.meta.apply(&patch));
        self.meta_writes.schedule((key, field), value);
        Ok(())
    }

    /// Write every pending debounced edit now; returns how many were written
    pub async fn flush(&self) -> usize {
        self.selection_writes.flush_all().await + self.meta_writes.flush_all().await
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("config", &self.shared.config)
            .field("key", &self.active_key())
            .field("pending_writes", &self.pending_writes())
            .finish_non_exhaustive()
    }
}
