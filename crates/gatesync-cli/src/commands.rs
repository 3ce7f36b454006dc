//! Operator commands
//!
//! Each command opens what it needs, does one thing and returns a value the
//! binary prints. Errors carry the path or key they concern.

use anyhow::{bail, Context, Result};
use gatesync_client::{BlockDocumentSink, SyncClient, SyncConfig};
use gatesync_sheet::{BlockDocument, GateSeed, SeedReport, StandardCatalog, Violation};
use gatesync_store::{
    ChecklistContext, ChecklistMeta, ChecklistMetaPatch, FileStore, ScopedStore, SharedStore,
    StandardRef, StoreRpc, UserScope, WriteMode,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Open the file store at `path` scoped to `user`
///
/// # Errors
/// If the store file exists but cannot be read or decoded
pub async fn open_store(path: &Path, user: &str) -> Result<SharedStore> {
    let file = FileStore::open(path)
        .await
        .with_context(|| format!("opening store {}", path.display()))?;
    let scoped = ScopedStore::new(UserScope::new(user), Arc::new(file));
    Ok(Arc::new(scoped))
}

/// Load the catalog at `path`, or an empty one
///
/// # Errors
/// If the catalog file cannot be read or decoded
pub fn load_catalog(path: Option<&Path>) -> Result<StandardCatalog> {
    match path {
        Some(path) => StandardCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(StandardCatalog::new()),
    }
}

/// Split a comma-separated title list
#[must_use]
pub fn parse_titles(titles: &str) -> Vec<String> {
    titles
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Seed gate blocks into the document at `doc`
///
/// Without `gate` the titles are gates numbered in order. With `gate` they
/// are checklists that all share that gate number.
///
/// # Errors
/// If the document cannot be loaded or saved
pub fn seed(doc: &Path, titles: &[String], gate: Option<u64>) -> Result<SeedReport> {
    let mut document =
        BlockDocument::load(doc).with_context(|| format!("loading document {}", doc.display()))?;
    let seeds = match gate {
        Some(number) => GateSeed::checklists(number, titles),
        None => GateSeed::numbered(titles),
    };
    let report = document.seed(&seeds);
    document
        .save(doc)
        .with_context(|| format!("saving document {}", doc.display()))?;
    Ok(report)
}

/// Push the JSON list in `items_path` as the selection for `ctx`
///
/// # Errors
/// If the file is not a list of standards or the store rejects the write
pub async fn push(store: SharedStore, ctx: &ChecklistContext, items_path: &Path) -> Result<usize> {
    let bytes = std::fs::read(items_path)
        .with_context(|| format!("reading items {}", items_path.display()))?;
    let items: Vec<StandardRef> = serde_json::from_slice(&bytes)
        .with_context(|| format!("decoding items {}", items_path.display()))?;
    let key = ctx.key()?;

    let response = StoreRpc::new(store)
        .push_selection_to_sidebar(key.as_str(), ctx, &items, WriteMode::Replace)
        .await;
    if !response.ok {
        bail!("selection push for '{key}' failed");
    }
    info!(%key, items = items.len(), "Pushed selection");
    Ok(items.len())
}

/// Selection and metadata of one checklist
#[derive(Debug, Clone, Serialize)]
pub struct PullOutput {
    /// Store key
    pub key: String,
    /// Selection timestamp
    pub ts: u64,
    /// Standards in order
    pub items: Vec<StandardRef>,
    /// Checklist metadata
    pub meta: ChecklistMeta,
}

/// Read selection and metadata for `ctx`
///
/// # Errors
/// If either read fails
pub async fn pull(store: SharedStore, ctx: &ChecklistContext) -> Result<PullOutput> {
    let key = ctx.key()?;
    let rpc = StoreRpc::new(store);

    let selection = rpc.pull_selection_by_key(key.as_str()).await;
    if !selection.ok {
        bail!("selection pull for '{key}' failed");
    }
    let meta = rpc.pull_checklist_meta_by_key(key.as_str()).await;
    if !meta.ok {
        bail!("metadata pull for '{key}' failed");
    }

    Ok(PullOutput {
        key: key.to_string(),
        ts: selection.ts,
        items: selection.items,
        meta: meta.meta,
    })
}

/// Merge `patch` into the metadata of `ctx`; returns the stored record
///
/// # Errors
/// If the patch is empty or the store rejects the write
pub async fn meta(
    store: SharedStore,
    ctx: &ChecklistContext,
    patch: &ChecklistMetaPatch,
) -> Result<ChecklistMeta> {
    if patch.is_empty() {
        bail!("nothing to update: pass at least one of --status, --assignee, --due, --feedback");
    }
    let key = ctx.key()?;
    let rpc = StoreRpc::new(store);

    if !rpc.push_checklist_meta_by_key(key.as_str(), patch).await.ok {
        bail!("metadata push for '{key}' failed");
    }
    let pulled = rpc.pull_checklist_meta_by_key(key.as_str()).await;
    if !pulled.ok {
        bail!("metadata pull for '{key}' failed");
    }
    Ok(pulled.meta)
}

/// Outcome of [`sync`]
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    /// Gate header row written
    pub header_row: usize,
    /// Standards written into the block
    pub items: usize,
    /// Metadata written into the header
    pub meta: ChecklistMeta,
}

/// Pull `ctx` through a sync client and write it into the document
///
/// The selection replaces the gate's block and the metadata lands in the
/// header row.
///
/// # Errors
/// If the document cannot be loaded, has no matching gate, or cannot be saved
pub async fn sync(
    store: SharedStore,
    doc: &Path,
    catalog: StandardCatalog,
    ctx: &ChecklistContext,
    config: SyncConfig,
) -> Result<SyncSummary> {
    let document = BlockDocument::load(doc)
        .with_context(|| format!("loading document {}", doc.display()))?
        .shared();
    let sink = BlockDocumentSink::new(Arc::clone(&document), Arc::new(catalog)).with_path(doc);
    let client = SyncClient::builder(store)
        .with_config(config)
        .with_sink(Arc::new(sink))
        .build()?;

    client.set_context(ctx.clone()).await?;
    let view = client.view();

    let mut document = document.lock();
    let header_row = document
        .find_checklist(&ctx.gate_id, &ctx.checklist_title)
        .with_context(|| {
            format!(
                "locating checklist '{}' of gate '{}' in {}",
                ctx.checklist_title,
                ctx.gate_id,
                doc.display()
            )
        })?;
    document.apply_meta(header_row, &view.meta)?;
    document
        .save(doc)
        .with_context(|| format!("saving document {}", doc.display()))?;

    Ok(SyncSummary {
        header_row,
        items: document.block(header_row).map_or(0, |b| b.rows.len()),
        meta: view.meta,
    })
}

/// Structural violations in the document at `doc`
///
/// # Errors
/// If the document cannot be loaded
pub fn check(doc: &Path) -> Result<Vec<Violation>> {
    let document =
        BlockDocument::load(doc).with_context(|| format!("loading document {}", doc.display()))?;
    Ok(document.verify())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_split_and_trim() {
        assert_eq!(
            parse_titles(" Intake, Design ,,Launch "),
            vec!["Intake", "Design", "Launch"]
        );
        assert!(parse_titles(" , ").is_empty());
    }

    #[test]
    fn missing_catalog_path_gives_empty_catalog() {
        assert!(load_catalog(None).unwrap().is_empty());
        assert!(load_catalog(Some(Path::new("/nonexistent/catalog.json"))).is_err());
    }
}
