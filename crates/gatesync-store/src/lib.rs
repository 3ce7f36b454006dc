//! gatesync Store
//!
//! Keyed, timestamped storage shared by the checklist panel and the standards
//! editor. The two surfaces never talk to each other directly; a write by one
//! is observed by the other only through a bumped per-key timestamp.
//!
//! # Core Concepts
//!
//! - [`KeyedStore`]: `pull` / `timestamp` / `push` contract with per-key [`Timestamp`]s
//! - [`MemoryStore`], [`FileStore`]: bundled backends
//! - [`ScopedStore`]: per-end-user view over a shared backend
//! - [`SelectionStore`]: ordered [`StandardRef`] lists, full replace only
//! - [`MetaStore`]: [`ChecklistMeta`] records with field-wise merge
//! - [`StoreRpc`]: `{ok, ...}` envelopes for the UI surfaces
//!
//! # Example
//!
//! ```rust,ignore
//! use gatesync_store::{ChecklistContext, MemoryStore, SelectionStore, StandardRef};
//! use std::sync::Arc;
//!
//! let selections = SelectionStore::new(Arc::new(MemoryStore::new()));
//! let ctx = ChecklistContext::new("1", "Intake");
//! let key = ctx.key()?;
//!
//! selections.push(&key, Some(&ctx), &[StandardRef::new("ISO-9001", "", 50.0)]).await?;
//! let snapshot = selections.pull(&key).await?;
//! assert_eq!(snapshot.items.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod file;
pub mod key;
pub mod memory;
pub mod meta;
pub mod record;
pub mod rpc;
pub mod scoped;
pub mod selection;
pub mod store;

// Re-exports
pub use error::{KeyError, StoreError};
pub use file::FileStore;
pub use key::{ChecklistContext, ChecklistKey, KEY_DELIMITER};
pub use memory::{MemoryStore, StoreStats};
pub use meta::MetaStore;
pub use record::{
    clamp_percent, percent_from_json, ChecklistMeta, ChecklistMetaPatch, ChecklistStatus,
    MetaField, StandardRef,
};
pub use rpc::{PullMetaResponse, PullSelectionResponse, PushResponse, StoreRpc};
pub use scoped::{ScopedStore, UserScope};
pub use selection::{SelectionSnapshot, SelectionStore};
pub use store::{KeyedStore, SharedStore, Stamped, StoreEntry, Timestamp, WriteMode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
