//! Testing utilities for the gatesync workspace
//!
//! Shared test doubles and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use gatesync_client::{EditorLauncher, EditorRequest, EditorSurface};
use gatesync_sheet::{BlockDocument, CatalogEntry, GateSeed, StandardCatalog};
use gatesync_store::{
    ChecklistContext, KeyedStore, MemoryStore, SelectionStore, SharedStore, Stamped,
    StandardRef, StoreError, Timestamp, WriteMode,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Pull,
    Timestamp,
    Push,
}

/// Memory store that records every call
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<(StoreOp, String)>>,
    push_delay: Mutex<Duration>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn set_available(&self, available: bool) {
        self.inner.set_available(available);
    }

    /// Make every push sleep for `delay` before it lands
    pub fn set_push_delay(&self, delay: Duration) {
        *self.push_delay.lock() = delay;
    }

    pub fn count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn count_prefixed(&self, op: StoreOp, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(o, key)| *o == op && key.starts_with(prefix))
            .count()
    }

    pub fn pulls(&self) -> usize {
        self.count(StoreOp::Pull)
    }

    pub fn timestamps(&self) -> usize {
        self.count(StoreOp::Timestamp)
    }

    pub fn pushes(&self) -> usize {
        self.count(StoreOp::Push)
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: StoreOp, key: &str) {
        self.calls.lock().push((op, key.to_string()));
    }
}

#[async_trait]
impl KeyedStore for CountingStore {
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError> {
        self.record(StoreOp::Pull, key);
        self.inner.pull(key).await
    }

    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        self.record(StoreOp::Timestamp, key);
        self.inner.timestamp(key).await
    }

    async fn push(&self, key: &str, value: Value, mode: WriteMode) -> Result<Timestamp, StoreError> {
        self.record(StoreOp::Push, key);
        let delay = *self.push_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.push(key, value, mode).await
    }
}

#[derive(Debug, Clone)]
enum Script {
    Submit {
        after: Duration,
        items: Vec<StandardRef>,
    },
    Never,
}

/// Editor launcher that plays back a scripted user
pub struct ScriptedEditorLauncher {
    store: SharedStore,
    script: Script,
    requests: Mutex<Vec<EditorRequest>>,
}

impl ScriptedEditorLauncher {
    /// Submit `items` (full replace) `after` the editor opens
    pub fn submitting(store: SharedStore, after: Duration, items: Vec<StandardRef>) -> Arc<Self> {
        Arc::new(Self {
            store,
            script: Script::Submit { after, items },
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Open and never write
    pub fn never(store: SharedStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            script: Script::Never,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn launches(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<EditorRequest> {
        self.requests.lock().last().cloned()
    }
}

impl EditorLauncher for ScriptedEditorLauncher {
    fn launch(&self, request: EditorRequest) {
        self.requests.lock().push(request.clone());

        let Script::Submit { after, items } = self.script.clone() else {
            return;
        };
        let selections = SelectionStore::new(Arc::clone(&self.store));
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut surface = EditorSurface::open(
                selections,
                EditorRequest {
                    items: Vec::new(),
                    ..request
                },
            );
            for item in items {
                surface.add(item);
            }
            // A failed write is what the poller's timeout path is for
            let _ = surface.submit().await;
        });
    }
}

impl std::fmt::Debug for ScriptedEditorLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedEditorLauncher")
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

pub fn context(gate: &str, title: &str) -> ChecklistContext {
    ChecklistContext::new(gate, title)
}

pub fn standard(code: &str, description: &str, percent: f64) -> StandardRef {
    StandardRef::new(code, description, percent)
}

pub fn sample_standards() -> Vec<StandardRef> {
    vec![
        standard("ISO-9001", "Quality management", 40.0),
        standard("IEC-61508", "Functional safety", 35.0),
        standard("ISO-27001", "", 25.0),
    ]
}

pub fn sample_catalog() -> StandardCatalog {
    StandardCatalog::from_entries([
        CatalogEntry::new("std-001", "ISO-9001", "Quality management"),
        CatalogEntry::new("std-002", "IEC-61508", "Functional safety"),
        CatalogEntry::new("std-003", "ISO-27001", "Information security"),
    ])
}

pub const GATE_TITLES: [&str; 4] = ["Intake", "Design", "Build", "Launch"];

pub fn seeded_document() -> BlockDocument {
    let mut document = BlockDocument::new();
    document.seed(&GateSeed::numbered(&GATE_TITLES));
    document
}

/// Store with `items` already written under `ctx`'s key `writes` times
pub async fn store_with_selection(
    ctx: &ChecklistContext,
    items: &[StandardRef],
    writes: u64,
) -> Arc<CountingStore> {
    let store = CountingStore::new();
    let selections = SelectionStore::new(Arc::clone(&store) as SharedStore);
    let key = ctx.key().unwrap();
    for _ in 0..writes {
        selections.push(&key, Some(ctx), items).await.unwrap();
    }
    store.reset();
    store
}
