//! gatesync Sheet
//!
//! The authoritative rendering of every checklist's standards: an ordered
//! list of rows forming gate blocks.
//!
//! ```text
//! 1  Gate | GateTitle | Description | Status | Assigned To | Due Date | Feedback
//! 2  1    | Intake    |             |        |             |          |
//! 3       | code      | description | percentage
//! 4       | ISO-9001  | Quality     | 50%
//! 5                                              <- spacer
//! 6  2    | Design    | ...
//! ```
//!
//! # Core Concepts
//!
//! - [`Sheet`]: 1-based rows of seven cells, persisted as JSON
//! - [`scan`]: positional searches for headers, sub-headers and run ends
//! - [`GateDocument`]: parsed preamble + [`GateBlock`]s, rendered back normalized
//! - [`BlockDocument`]: the editing surface (`seed`, `apply_selection`,
//!   `replace_selection`, `apply_meta`, `find_gate`, `find_checklist`, `verify`)
//! - [`StandardCatalog`]: code / id to description lookup
//!
//! # Invariant
//!
//! Every block's data run is followed by exactly one fully blank row before
//! the next block or the end of the document. Each write re-establishes it.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod document;
pub mod error;
pub mod model;
pub mod scan;
pub mod sheet;

// Re-exports
pub use catalog::{CatalogEntry, StandardCatalog};
pub use document::{ApplyReport, BlockDocument, GateSeed, SeedReport, SharedDocument};
pub use error::DocumentError;
pub use model::{DataRow, GateBlock, GateDocument, GateHeader, Violation};
pub use scan::{find_block_end, find_next_gate_row, find_sub_header};
pub use sheet::{col, Cell, CellValue, NumberFormat, Row, Sheet, COLUMN_COUNT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
