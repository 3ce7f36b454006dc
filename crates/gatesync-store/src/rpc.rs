//! Store RPC surface
//!
//! The four calls the UI surfaces make against the store, with the
//! `{ok, ...}` envelopes they expect. Failures are logged and reported as
//! `ok: false`; nothing here returns an error to the caller.

use crate::key::{ChecklistContext, ChecklistKey};
use crate::meta::MetaStore;
use crate::record::{ChecklistMeta, ChecklistMetaPatch, StandardRef};
use crate::selection::SelectionStore;
use crate::store::{SharedStore, WriteMode};
use serde::{Deserialize, Serialize};

/// Response of `pullSelectionByKey`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSelectionResponse {
    /// Call succeeded
    pub ok: bool,
    /// Items in insertion order
    pub items: Vec<StandardRef>,
    /// Store timestamp
    pub ts: u64,
}

/// Response of `pullChecklistMetaByKey`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullMetaResponse {
    /// Call succeeded
    pub ok: bool,
    /// Metadata record (default on failure)
    pub meta: ChecklistMeta,
}

/// Response of the push calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Call succeeded
    pub ok: bool,
}

impl PushResponse {
    const OK: Self = Self { ok: true };
    const FAILED: Self = Self { ok: false };
}

/// RPC facade over the selection and metadata stores
#[derive(Debug, Clone)]
pub struct StoreRpc {
    selections: SelectionStore,
    meta: MetaStore,
}

impl StoreRpc {
    /// Create facade over a shared store
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            selections: SelectionStore::new(store.clone()),
            meta: MetaStore::new(store),
        }
    }

    /// `pullSelectionByKey(key) -> {ok, items, ts}`
    pub async fn pull_selection_by_key(&self, key: &str) -> PullSelectionResponse {
        match self.selections.pull(&ChecklistKey::from_raw(key)).await {
            Ok(snapshot) => PullSelectionResponse {
                ok: true,
                items: snapshot.items,
                ts: snapshot.ts.get(),
            },
            Err(e) => {
                tracing::warn!(key, error = %e, "pullSelectionByKey failed");
                PullSelectionResponse {
                    ok: false,
                    items: Vec::new(),
                    ts: 0,
                }
            }
        }
    }

    /// `pushSelectionToSidebar(key, ctx, items, mode) -> {ok}`
    ///
    /// Selection lists only support full replace; `merge` is accepted and
    /// treated as `replace`. A context that derives a different key than
    /// `key` is rejected.
    pub async fn push_selection_to_sidebar(
        &self,
        key: &str,
        ctx: &ChecklistContext,
        items: &[StandardRef],
        mode: WriteMode,
    ) -> PushResponse {
        match ctx.key() {
            Ok(derived) if derived.as_str() == key => {}
            Ok(derived) => {
                tracing::warn!(key, derived = %derived, "context does not match key");
                return PushResponse::FAILED;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "invalid checklist context");
                return PushResponse::FAILED;
            }
        }

        if mode == WriteMode::Merge {
            tracing::debug!(key, "merge requested for selection push; replacing full list");
        }

        match self
            .selections
            .push(&ChecklistKey::from_raw(key), Some(ctx), items)
            .await
        {
            Ok(_) => PushResponse::OK,
            Err(e) => {
                tracing::warn!(key, error = %e, "pushSelectionToSidebar failed");
                PushResponse::FAILED
            }
        }
    }

    /// `pullChecklistMetaByKey(key) -> {ok, meta}`
    pub async fn pull_checklist_meta_by_key(&self, key: &str) -> PullMetaResponse {
        match self.meta.pull(&ChecklistKey::from_raw(key)).await {
            Ok((meta, _)) => PullMetaResponse { ok: true, meta },
            Err(e) => {
                tracing::warn!(key, error = %e, "pullChecklistMetaByKey failed");
                PullMetaResponse {
                    ok: false,
                    meta: ChecklistMeta::default(),
                }
            }
        }
    }

    /// `pushChecklistMetaByKey(key, partialMeta) -> {ok}`
    pub async fn push_checklist_meta_by_key(
        &self,
        key: &str,
        patch: &ChecklistMetaPatch,
    ) -> PushResponse {
        match self.meta.push(&ChecklistKey::from_raw(key), patch).await {
            Ok(_) => PushResponse::OK,
            Err(e) => {
                tracing::warn!(key, error = %e, "pushChecklistMetaByKey failed");
                PushResponse::FAILED
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::record::ChecklistStatus;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, StoreRpc) {
        let backend = Arc::new(MemoryStore::new());
        (backend.clone(), StoreRpc::new(backend))
    }

    #[tokio::test]
    async fn selection_push_then_pull() {
        let (_, rpc) = setup();
        let ctx = ChecklistContext::new("1", "Intake");
        let items = vec![StandardRef::new("A", "alpha", 40.0)];

        let pushed = rpc
            .push_selection_to_sidebar("1::Intake", &ctx, &items, WriteMode::Replace)
            .await;
        assert!(pushed.ok);

        let pulled = rpc.pull_selection_by_key("1::Intake").await;
        assert!(pulled.ok);
        assert_eq!(pulled.items, items);
        assert_eq!(pulled.ts, 1);
    }

    #[tokio::test]
    async fn merge_mode_replaces_selection() {
        let (_, rpc) = setup();
        let ctx = ChecklistContext::new("1", "Intake");

        rpc.push_selection_to_sidebar(
            "1::Intake",
            &ctx,
            &[StandardRef::new("A", "", 1.0), StandardRef::new("B", "", 2.0)],
            WriteMode::Replace,
        )
        .await;
        rpc.push_selection_to_sidebar(
            "1::Intake",
            &ctx,
            &[StandardRef::new("C", "", 3.0)],
            WriteMode::Merge,
        )
        .await;

        let pulled = rpc.pull_selection_by_key("1::Intake").await;
        assert_eq!(pulled.items, vec![StandardRef::new("C", "", 3.0)]);
    }

    #[tokio::test]
    async fn mismatched_context_is_rejected() {
        let (_, rpc) = setup();
        let ctx = ChecklistContext::new("2", "Intake");

        let pushed = rpc
            .push_selection_to_sidebar("1::Intake", &ctx, &[], WriteMode::Replace)
            .await;
        assert!(!pushed.ok);
        assert_eq!(rpc.pull_selection_by_key("1::Intake").await.ts, 0);
    }

    #[tokio::test]
    async fn unavailable_store_reports_not_ok() {
        let (backend, rpc) = setup();
        backend.set_available(false);

        let pulled = rpc.pull_selection_by_key("1::Intake").await;
        assert!(!pulled.ok);
        assert!(pulled.items.is_empty());

        let meta = rpc.pull_checklist_meta_by_key("1::Intake").await;
        assert!(!meta.ok);

        let pushed = rpc
            .push_checklist_meta_by_key("1::Intake", &ChecklistMetaPatch::new().with_feedback("x"))
            .await;
        assert!(!pushed.ok);
    }

    #[tokio::test]
    async fn meta_push_merges() {
        let (_, rpc) = setup();
        rpc.push_checklist_meta_by_key(
            "1::Intake",
            &ChecklistMetaPatch::new().with_status(ChecklistStatus::Rejected),
        )
        .await;
        rpc.push_checklist_meta_by_key("1::Intake", &ChecklistMetaPatch::new().with_feedback("redo"))
            .await;

        let pulled = rpc.pull_checklist_meta_by_key("1::Intake").await;
        assert!(pulled.ok);
        assert_eq!(pulled.meta.status, ChecklistStatus::Rejected);
        assert_eq!(pulled.meta.feedback, "redo");
    }

    #[test]
    fn responses_use_camel_case() {
        let response = PullMetaResponse {
            ok: true,
            meta: ChecklistMeta {
                due_date: "2026-01-02".to_string(),
                ..ChecklistMeta::default()
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["meta"]["dueDate"], json!("2026-01-02"));
    }
}
