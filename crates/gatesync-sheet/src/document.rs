//! Block-structured checklist document
//!
//! Provides:
//! - Seeding of gate header rows from a title list
//! - Append / replace of a gate block's data run
//! - Header metadata writes
//! - Invariant verification and repair
//!
//! Every editing operation validates its inputs before touching a row, then
//! rewrites only the target block's row range and re-checks the spacer row
//! that follows it.

use crate::catalog::StandardCatalog;
use crate::error::DocumentError;
use crate::model::{DataRow, GateBlock, GateDocument, GateHeader, Violation};
use crate::sheet::{col, CellValue, NumberFormat, Row, Sheet, SEED_LABELS};
use gatesync_store::{ChecklistMeta, StandardRef};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Document shared between the sync client and other writers
pub type SharedDocument = Arc<Mutex<BlockDocument>>;

/// One gate to seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSeed {
    /// Gate number
    pub number: u64,
    /// Gate title
    pub title: String,
    /// Initial status (left untouched on existing gates when empty)
    pub status: String,
    /// May move an existing block with the same title to `number`
    pub renumber: bool,
}

impl GateSeed {
    /// Create new seed
    #[inline]
    #[must_use]
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            status: String::new(),
            renumber: false,
        }
    }

    /// Allow renumbering an existing block with the same title
    #[inline]
    #[must_use]
    pub fn renumbering(mut self) -> Self {
        self.renumber = true;
        self
    }

    /// Set initial status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// One seed per checklist title, all under gate `number`
    #[must_use]
    pub fn checklists<S: AsRef<str>>(number: u64, titles: &[S]) -> Vec<Self> {
        titles
            .iter()
            .map(|title| Self::new(number, title.as_ref().trim()))
            .collect()
    }

    /// Seeds numbered 1.. in list order, renumbering titles that moved
    #[must_use]
    pub fn numbered<S: AsRef<str>>(titles: &[S]) -> Vec<Self> {
        titles
            .iter()
            .zip(1u64..)
            .map(|(title, number)| Self::new(number, title.as_ref().trim()).renumbering())
            .collect()
    }
}

/// Outcome of [`BlockDocument::seed`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Column label row was written
    pub labels_written: bool,
    /// Titles appended as new blocks
    pub created: Vec<String>,
    /// Titles that already existed and were updated in place
    pub updated: Vec<String>,
}

/// Outcome of a block write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Gate header row
    pub header_row: usize,
    /// First data row of the run after the write
    pub first_data_row: Option<usize>,
    /// Last data row of the run after the write
    pub last_data_row: Option<usize>,
    /// Data rows written by this call
    pub rows_written: usize,
    /// Sub-header row was created by this call
    pub sub_header_created: bool,
    /// Spacer row was missing and had to be inserted
    pub spacer_inserted: bool,
    /// Codes with no description and no catalog entry
    pub missing_catalog: Vec<String>,
}

impl ApplyReport {
    /// Non-fatal problems as errors
    #[must_use]
    pub fn warnings(&self) -> Vec<DocumentError> {
        self.missing_catalog
            .iter()
            .map(|code| DocumentError::MissingCatalogEntry { code: code.clone() })
            .collect()
    }

    /// True if every description was resolved
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_catalog.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Append,
    Replace,
}

/// Tabular checklist document with gate-block structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDocument {
    sheet: Sheet,
}

impl BlockDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing sheet
    #[inline]
    #[must_use]
    pub fn from_sheet(sheet: Sheet) -> Self {
        Self { sheet }
    }

    /// Load from a JSON file; a missing file yields an empty document
    ///
    /// # Errors
    /// See [`Sheet::load`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        Sheet::load(path).map(Self::from_sheet)
    }

    /// Save as JSON
    ///
    /// # Errors
    /// See [`Sheet::save`]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        self.sheet.save(path)
    }

    /// Wrap for shared use
    #[must_use]
    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    /// Underlying sheet
    #[inline]
    #[must_use]
    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Consume into the underlying sheet
    #[inline]
    #[must_use]
    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    /// Parsed structured view
    #[must_use]
    pub fn parse(&self) -> GateDocument {
        GateDocument::parse(&self.sheet)
    }

    /// Write the label row (if the sheet is empty) and one block per seed
    ///
    /// A block with the same number and title (case-insensitive) is reused.
    /// A renumbering seed also takes over a block with the same title whose
    /// current number is not itself seeded with that title in this call.
    /// Reused blocks get their status updated when the seed carries one.
    pub fn seed(&mut self, seeds: &[GateSeed]) -> SeedReport {
        let mut report = SeedReport::default();

        if self.sheet.is_empty() {
            self.sheet.append_row(Row::from_texts(&SEED_LABELS));
            report.labels_written = true;
        }

        for seed in seeds {
            let title = seed.title.trim();
            if title.is_empty() {
                continue;
            }

            let existing = self.seed_target(seeds, seed, title);
            if let Some(row_idx) = existing {
                if let Some(row) = self.sheet.row_mut(row_idx) {
                    row.set(col::GATE, GateHeader::number_cell(seed.number));
                    if !seed.status.trim().is_empty() {
                        row.set(col::STATUS, CellValue::text(seed.status.trim()));
                    }
                }
                report.updated.push(title.to_string());
                continue;
            }

            // Close a trailing block that lost its spacer before appending
            let last = self.sheet.last_row();
            if self.sheet.is_gate_row(find_block_start(&self.sheet, last))
                && !self.sheet.is_blank_row(last)
            {
                self.sheet.append_row(Row::blank());
            }

            let mut header = GateHeader::new(seed.number, title);
            header.status = seed.status.trim().to_string();
            self.sheet.append_row(header.to_row());
            self.sheet.append_row(Row::blank());
            report.created.push(title.to_string());
        }

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            "Seeded gate blocks"
        );
        report
    }

    fn seed_target(&self, seeds: &[GateSeed], seed: &GateSeed, title: &str) -> Option<usize> {
        let doc = self.parse();
        let claimed = |n: u64| {
            seeds
                .iter()
                .any(|s| s.number == n && s.title.trim().eq_ignore_ascii_case(title))
        };
        doc.blocks
            .iter()
            .find(|b| b.header.number == seed.number && b.header.title_matches(title))
            .or_else(|| {
                doc.blocks.iter().find(|b| {
                    seed.renumber && b.header.title_matches(title) && !claimed(b.header.number)
                })
            })
            .and_then(GateBlock::header_row)
    }

    /// Append `items` to the end of the block headed at `target_row`
    ///
    /// # Errors
    /// - [`DocumentError::InvalidTarget`] if `target_row` is not a gate header
    /// - [`DocumentError::EmptySelection`] if `items` is empty
    /// - [`DocumentError::BlankCode`] if an item has no code
    ///
    /// All are raised before the sheet is modified.
    pub fn apply_selection(
        &mut self,
        target_row: usize,
        items: &[StandardRef],
        catalog: &StandardCatalog,
    ) -> Result<ApplyReport, DocumentError> {
        self.validate_target(target_row)?;
        if items.is_empty() {
            return Err(DocumentError::EmptySelection);
        }
        validate_items(items)?;
        self.write_block(target_row, items, catalog, WriteKind::Append)
    }

    /// Replace the data run of the block headed at `target_row`
    ///
    /// An empty `items` list clears the run and keeps the sub-header.
    ///
    /// # Errors
    /// - [`DocumentError::InvalidTarget`] if `target_row` is not a gate header
    /// - [`DocumentError::BlankCode`] if an item has no code
    pub fn replace_selection(
        &mut self,
        target_row: usize,
        items: &[StandardRef],
        catalog: &StandardCatalog,
    ) -> Result<ApplyReport, DocumentError> {
        self.validate_target(target_row)?;
        validate_items(items)?;
        self.write_block(target_row, items, catalog, WriteKind::Replace)
    }

    /// Write metadata into header columns 4–7
    ///
    /// # Errors
    /// [`DocumentError::InvalidTarget`] if `target_row` is not a gate header
    pub fn apply_meta(&mut self, target_row: usize, meta: &ChecklistMeta) -> Result<(), DocumentError> {
        self.validate_target(target_row)?;
        let Some(row) = self.sheet.row_mut(target_row) else {
            return Err(DocumentError::invalid_target(target_row, "row out of range"));
        };
        row.set(col::STATUS, CellValue::text(meta.status.to_string()));
        row.set(col::ASSIGNED_TO, CellValue::text(&meta.assignee));
        row.set(col::DUE_DATE, CellValue::text(&meta.due_date));
        row.set(col::FEEDBACK, CellValue::text(&meta.feedback));
        debug!(row = target_row, status = %meta.status, "Wrote gate metadata");
        Ok(())
    }

    /// Header row of a gate by number or case-insensitive title
    ///
    /// # Errors
    /// [`DocumentError::GateNotFound`] if no block matches
    pub fn find_gate(&self, gate_id: &str) -> Result<usize, DocumentError> {
        self.parse()
            .find_gate(gate_id)
            .and_then(GateBlock::header_row)
            .ok_or_else(|| DocumentError::GateNotFound(gate_id.trim().to_string()))
    }

    /// Header row of one checklist's block: the title must match and, when
    /// `gate_id` is a number, so must the gate number
    ///
    /// # Errors
    /// [`DocumentError::GateNotFound`] if no block matches
    pub fn find_checklist(
        &self,
        gate_id: &str,
        checklist_title: &str,
    ) -> Result<usize, DocumentError> {
        self.parse()
            .find_block(gate_id, checklist_title)
            .and_then(GateBlock::header_row)
            .ok_or_else(|| {
                let label = format!("{} / {}", gate_id.trim(), checklist_title.trim());
                DocumentError::GateNotFound(label)
            })
    }

    /// Parsed block headed at `header_row`
    #[must_use]
    pub fn block(&self, header_row: usize) -> Option<GateBlock> {
        GateBlock::parse(&self.sheet, header_row)
    }

    /// Structural invariant violations
    #[must_use]
    pub fn verify(&self) -> Vec<Violation> {
        self.parse().violations()
    }

    /// Re-render every block with exactly one spacer; returns violations fixed
    ///
    /// Duplicate gates are reported but cannot be repaired here.
    pub fn repair(&mut self) -> usize {
        let doc = self.parse();
        let before = doc
            .violations()
            .iter()
            .filter(|v| matches!(v, Violation::MissingSpacer { .. } | Violation::ExtraBlankRows { .. }))
            .count();
        if before > 0 {
            self.sheet = doc.render();
            info!(fixed = before, "Repaired spacer rows");
        }
        before
    }

    fn validate_target(&self, target_row: usize) -> Result<(), DocumentError> {
        match self.sheet.row(target_row) {
            None => Err(DocumentError::invalid_target(target_row, "row out of range")),
            Some(row) if !row.is_gate_header() => {
                Err(DocumentError::invalid_target(target_row, "not a gate header"))
            }
            Some(_) => Ok(()),
        }
    }

    fn write_block(
        &mut self,
        target_row: usize,
        items: &[StandardRef],
        catalog: &StandardCatalog,
        kind: WriteKind,
    ) -> Result<ApplyReport, DocumentError> {
        let mut block = GateBlock::parse(&self.sheet, target_row)
            .ok_or_else(|| DocumentError::invalid_target(target_row, "not a gate header"))?;
        let source = block
            .source
            .clone()
            .unwrap_or(target_row..=target_row);

        let mut missing_catalog = Vec::new();
        let rows: Vec<DataRow> = items
            .iter()
            .map(|item| {
                let mut row = DataRow::from(item);
                if row.description.is_empty() {
                    match catalog.describe(&row.code) {
                        Ok(description) => row.description = description.to_string(),
                        Err(_) => {
                            warn!(code = %row.code, "No catalog entry, leaving description empty");
                            missing_catalog.push(row.code.clone());
                        }
                    }
                }
                row
            })
            .collect();

        let sub_header_created = !block.has_sub_header;
        let rows_written = rows.len();
        match kind {
            WriteKind::Append => block.append(rows),
            WriteKind::Replace => block.replace(rows),
        }

        let mut rendered = block.render();
        let block_len = rendered.len();
        if block.blank_rows > 0 {
            rendered.push(Row::blank());
        }
        self.sheet.splice_rows(source, rendered);

        let last_block_row = target_row + block_len - 1;
        let spacer_inserted = self.ensure_spacer(last_block_row);

        let (first_data_row, last_data_row) = if block.rows.is_empty() {
            (None, None)
        } else {
            let first = last_block_row + 1 - block.rows.len();
            self.sheet
                .set_number_format(first, last_block_row, col::PERCENT, Some(NumberFormat::Percent));
            (Some(first), Some(last_block_row))
        };

        debug!(
            header_row = target_row,
            rows_written,
            sub_header_created,
            spacer_inserted,
            ?kind,
            "Wrote gate block"
        );

        Ok(ApplyReport {
            header_row: target_row,
            first_data_row,
            last_data_row,
            rows_written,
            sub_header_created,
            spacer_inserted,
            missing_catalog,
        })
    }

    /// Make sure the row after `last_block_row` is blank; true if one was added
    fn ensure_spacer(&mut self, last_block_row: usize) -> bool {
        if self.sheet.is_blank_row(last_block_row + 1) {
            return false;
        }
        self.sheet.insert_rows_after(last_block_row, [Row::blank()]);
        true
    }
}

/// Every item needs a code; a code-less row reads as a blank spacer
fn validate_items(items: &[StandardRef]) -> Result<(), DocumentError> {
    match items.iter().position(|item| item.code.trim().is_empty()) {
        Some(index) => Err(DocumentError::BlankCode { index }),
        None => Ok(()),
    }
}

/// Header row of the block containing `row`, or 0 if `row` is in the preamble
fn find_block_start(sheet: &Sheet, row: usize) -> usize {
    (1..=row).rev().find(|&r| sheet.is_gate_row(r)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use pretty_assertions::assert_eq;

    fn seeded() -> BlockDocument {
        let mut doc = BlockDocument::new();
        doc.seed(&GateSeed::numbered(&["Intake", "Design", "Launch"]));
        doc
    }

    fn catalog() -> StandardCatalog {
        StandardCatalog::from_entries([CatalogEntry::new("s1", "ISO-9001", "Quality management")])
    }

    #[test]
    fn seed_writes_labels_headers_and_spacers() {
        let doc = seeded();
        let sheet = doc.sheet();
        assert_eq!(sheet.last_row(), 7);
        assert_eq!(sheet.row(1).unwrap().text(col::TITLE), "GateTitle");
        assert!(sheet.is_gate_row(2));
        assert!(sheet.is_blank_row(3));
        assert!(sheet.is_gate_row(6));
        assert!(doc.verify().is_empty());
    }

    #[test]
    fn reseed_updates_in_place() {
        let mut doc = seeded();
        let report = doc.seed(&[GateSeed::new(9, "design").renumbering().with_status("Approved")]);

        assert_eq!(report.updated, vec!["design".to_string()]);
        assert!(report.created.is_empty());
        assert_eq!(doc.sheet().last_row(), 7);

        let row = doc.sheet().row(4).unwrap();
        assert_eq!(row.text(col::GATE), "9");
        assert_eq!(row.text(col::TITLE), "Design");
        assert_eq!(row.text(col::STATUS), "Approved");
    }

    #[test]
    fn apply_creates_sub_header_and_spacer() {
        let mut doc = seeded();
        let report = doc
            .apply_selection(
                4,
                &[
                    StandardRef::code_only("ISO-9001", 0.0),
                    StandardRef::new("X-1", "Custom", 40.0),
                ],
                &catalog(),
            )
            .unwrap();

        assert!(report.sub_header_created);
        assert!(!report.spacer_inserted);
        assert_eq!(report.first_data_row, Some(6));
        assert_eq!(report.last_data_row, Some(7));

        let sheet = doc.sheet();
        assert!(sheet.row(5).unwrap().is_sub_header());
        assert_eq!(sheet.row(6).unwrap().text(col::DESCRIPTION), "Quality management");
        assert_eq!(sheet.row(7).unwrap().cell(col::PERCENT).display(), "40%");
        assert!(sheet.is_blank_row(8));
        assert!(sheet.is_gate_row(9));
        assert!(doc.verify().is_empty());
    }

    #[test]
    fn second_apply_appends_to_run() {
        let mut doc = seeded();
        doc.apply_selection(2, &[StandardRef::new("A", "a", 10.0)], &catalog()).unwrap();
        let report = doc.apply_selection(2, &[StandardRef::new("B", "b", 20.0)], &catalog()).unwrap();

        assert!(!report.sub_header_created);
        assert_eq!(report.rows_written, 1);
        let codes: Vec<_> = doc.block(2).unwrap().rows.iter().map(|r| r.code.clone()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn apply_inserts_missing_spacer() {
        let mut doc = BlockDocument::from_sheet(Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["2", "Design"]),
        ]));
        let report = doc.apply_selection(1, &[StandardRef::new("A", "a", 5.0)], &catalog()).unwrap();

        assert!(report.spacer_inserted);
        assert!(doc.sheet().is_blank_row(4));
        assert!(doc.sheet().is_gate_row(5));
    }

    #[test]
    fn replace_with_empty_list_clears_run() {
        let mut doc = seeded();
        doc.apply_selection(2, &[StandardRef::new("A", "a", 10.0)], &catalog()).unwrap();
        let report = doc.replace_selection(2, &[], &catalog()).unwrap();

        assert_eq!(report.first_data_row, None);
        assert!(doc.block(2).unwrap().rows.is_empty());
        assert!(doc.sheet().row(3).unwrap().is_sub_header());
        assert!(doc.verify().is_empty());
    }

    #[test]
    fn invalid_target_leaves_sheet_untouched() {
        let mut doc = seeded();
        let before = doc.clone();

        let err = doc.apply_selection(3, &[StandardRef::code_only("A", 0.0)], &catalog()).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidTarget { row: 3, .. }));

        let err = doc.apply_selection(99, &[], &catalog()).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidTarget { row: 99, .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn apply_meta_writes_header_columns() {
        let mut doc = seeded();
        let meta = ChecklistMeta {
            assignee: "ana".into(),
            due_date: "2024-05-01".into(),
            ..ChecklistMeta::default()
        };
        doc.apply_meta(2, &meta).unwrap();

        let row = doc.sheet().row(2).unwrap();
        assert_eq!(row.text(col::ASSIGNED_TO), "ana");
        assert_eq!(row.text(col::DUE_DATE), "2024-05-01");
        assert_eq!(row.text(col::STATUS), "");
    }

    #[test]
    fn find_gate_returns_header_row() {
        let doc = seeded();
        assert_eq!(doc.find_gate("3").unwrap(), 6);
        assert_eq!(doc.find_gate("DESIGN").unwrap(), 4);
        assert!(matches!(doc.find_gate("nope"), Err(DocumentError::GateNotFound(_))));
    }

    #[test]
    fn checklists_seed_under_one_gate_number() {
        let mut doc = BlockDocument::new();
        let report = doc.seed(&GateSeed::checklists(1, &["Scope", "Budget"]));
        assert_eq!(report.created.len(), 2);
        doc.seed(&GateSeed::checklists(2, &["Scope"]));

        assert_eq!(doc.find_checklist("1", "Scope").unwrap(), 2);
        assert_eq!(doc.find_checklist("1", "budget").unwrap(), 4);
        assert_eq!(doc.find_checklist("2", "Scope").unwrap(), 6);
        assert!(matches!(
            doc.find_checklist("2", "Budget"),
            Err(DocumentError::GateNotFound(_))
        ));
        assert!(doc.verify().is_empty());

        let again = doc.seed(&GateSeed::checklists(1, &["Scope", "Budget"]));
        assert_eq!(again.updated.len(), 2);
        assert_eq!(doc.sheet().last_row(), 7);
    }

    #[test]
    fn checklists_of_one_gate_keep_their_own_rows() {
        let mut doc = BlockDocument::new();
        doc.seed(&GateSeed::checklists(1, &["Scope", "Budget"]));

        let scope = doc.find_checklist("1", "Scope").unwrap();
        doc.replace_selection(scope, &[StandardRef::new("A-1", "a", 10.0)], &catalog())
            .unwrap();
        let budget = doc.find_checklist("1", "Budget").unwrap();
        doc.replace_selection(budget, &[StandardRef::new("B-1", "b", 20.0)], &catalog())
            .unwrap();

        let codes = |row: usize| -> Vec<String> {
            doc.block(row).unwrap().rows.into_iter().map(|r| r.code).collect()
        };
        assert_eq!(codes(doc.find_checklist("1", "Scope").unwrap()), vec!["A-1"]);
        assert_eq!(codes(doc.find_checklist("1", "Budget").unwrap()), vec!["B-1"]);
        assert!(doc.verify().is_empty());
    }

    #[test]
    fn blank_code_is_rejected_before_any_write() {
        let mut doc = seeded();
        let before = doc.sheet().clone();
        let items = [StandardRef::new("", "", 50.0), StandardRef::new("B", "b", 10.0)];

        assert!(matches!(
            doc.apply_selection(2, &items, &catalog()),
            Err(DocumentError::BlankCode { index: 0 })
        ));
        assert!(matches!(
            doc.replace_selection(2, &[StandardRef::new("B", "b", 10.0), StandardRef::code_only("  ", 5.0)], &catalog()),
            Err(DocumentError::BlankCode { index: 1 })
        ));
        assert_eq!(doc.sheet(), &before);
    }

    #[test]
    fn repair_collapses_blank_rows() {
        let mut doc = BlockDocument::from_sheet(Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::blank(),
            Row::blank(),
            Row::from_texts(&["2", "Design"]),
        ]));
        assert_eq!(doc.verify().len(), 2);
        assert_eq!(doc.repair(), 2);
        assert!(doc.verify().is_empty());
        assert_eq!(doc.sheet().last_row(), 4);
    }
}
