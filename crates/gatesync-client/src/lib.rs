//! gatesync Client
//!
//! Panel-side half of the checklist synchronization protocol.
//!
//! The panel opens the standards editor and loses control flow while it is
//! open. It learns about the editor's write only by watching the key's
//! timestamp in the shared store:
//!
//! ```text
//! panel: set_context -> open_editor -> poll ts (8 x 150ms) -> pull -> view + document
//! editor:                  open     -> edit -> submit (one full replace)
//! ```
//!
//! # Core Concepts
//!
//! - [`SyncClient`]: active key, bounded polling, debounced write-back, [`PanelView`] channel
//! - [`EditorSurface`]: the editor's working list, consumed by `submit` / `cancel`
//! - [`Debouncer`]: keyed trailing-edge debounce used for every local edit
//! - [`DocumentSink`]: receives block replaces after each pull
//! - [`SyncConfig`]: timing, loadable from TOML

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod client;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod poll;

// Re-exports
pub use client::{BlockDocumentSink, DocumentSink, PanelView, SyncClient, SyncClientBuilder};
pub use config::SyncConfig;
pub use debounce::{Debouncer, FlushFn};
pub use editor::{EditorLauncher, EditorRequest, EditorSurface, NoopLauncher};
pub use error::ClientError;
pub use poll::{PollHandle, PollOutcome, PollState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
