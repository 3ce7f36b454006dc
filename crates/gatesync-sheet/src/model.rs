//! Structured view of the gate-block document
//!
//! The sheet is parsed into a [`GateDocument`]: preamble rows followed by
//! [`GateBlock`]s, each owning its header, note rows, optional sub-header
//! marker and data rows. Edits happen on this model; rendering a block back
//! always produces header, notes, sub-header and the data run, and the
//! caller appends exactly one spacer row.
//!
//! Parsing is tolerant. Stray non-blank rows outside the data run become
//! note rows (rendered between the header and the sub-header) and surplus
//! blank rows collapse into the single spacer.

use crate::scan::{find_block_end, find_next_gate_row, find_sub_header};
use crate::sheet::{col, CellValue, NumberFormat, Row, Sheet, SUB_HEADER_LABELS};
use gatesync_store::{clamp_percent, StandardRef};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

/// Gate header row contents (columns 1–7)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateHeader {
    /// Gate number (column 1)
    pub number: u64,
    /// Gate title (column 2)
    pub title: String,
    /// Description (column 3)
    pub description: String,
    /// Status (column 4)
    pub status: String,
    /// Assignee (column 5)
    pub assigned_to: String,
    /// Due date (column 6)
    pub due_date: String,
    /// Feedback (column 7)
    pub feedback: String,
}

impl GateHeader {
    /// Create header with number and title
    #[inline]
    #[must_use]
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Read header from a row; `None` if the row is not a gate header
    #[must_use]
    pub fn from_row(row: &Row) -> Option<Self> {
        if !row.is_gate_header() {
            return None;
        }
        Some(Self {
            number: row.text(col::GATE).parse().ok()?,
            title: row.text(col::TITLE),
            description: row.text(col::DESCRIPTION),
            status: row.text(col::STATUS),
            assigned_to: row.text(col::ASSIGNED_TO),
            due_date: row.text(col::DUE_DATE),
            feedback: row.text(col::FEEDBACK),
        })
    }

    /// Render as a sheet row
    #[must_use]
    pub fn to_row(&self) -> Row {
        let mut row = Row::blank();
        row.set(col::GATE, Self::number_cell(self.number));
        row.set(col::TITLE, CellValue::text(&self.title));
        row.set(col::DESCRIPTION, CellValue::text(&self.description));
        row.set(col::STATUS, CellValue::text(&self.status));
        row.set(col::ASSIGNED_TO, CellValue::text(&self.assigned_to));
        row.set(col::DUE_DATE, CellValue::text(&self.due_date));
        row.set(col::FEEDBACK, CellValue::text(&self.feedback));
        row
    }

    /// Gate number as a numeric cell
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn number_cell(number: u64) -> CellValue {
        CellValue::Number(number as f64)
    }

    /// Case-insensitive title comparison
    #[inline]
    #[must_use]
    pub fn title_matches(&self, title: &str) -> bool {
        self.title.trim().eq_ignore_ascii_case(title.trim())
    }
}

/// One standard row inside a gate block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRow {
    /// Standard code (column 2)
    pub code: String,
    /// Description (column 3)
    pub description: String,
    /// Weight percentage in `0..=100` (stored as a fraction in column 4)
    pub percent: f64,
}

impl DataRow {
    /// Read data row from a sheet row
    #[must_use]
    pub fn from_row(row: &Row) -> Self {
        Self {
            code: row.text(col::CODE),
            description: row.text(col::DESCRIPTION),
            percent: percent_from_cell(&row.cell(col::PERCENT).value),
        }
    }

    /// Render as a sheet row with the percentage written as a formatted fraction
    #[must_use]
    pub fn to_row(&self) -> Row {
        let mut row = Row::blank();
        row.set(col::CODE, CellValue::text(&self.code));
        row.set(col::DESCRIPTION, CellValue::text(&self.description));
        row.set(col::PERCENT, CellValue::Number(clamp_percent(self.percent) / 100.0));
        row.set_format(col::PERCENT, Some(NumberFormat::Percent));
        row
    }
}

impl From<&StandardRef> for DataRow {
    fn from(item: &StandardRef) -> Self {
        Self {
            code: item.code.trim().to_string(),
            description: item.description.trim().to_string(),
            percent: clamp_percent(item.percent),
        }
    }
}

impl From<&DataRow> for StandardRef {
    fn from(row: &DataRow) -> Self {
        StandardRef::new(row.code.clone(), row.description.clone(), row.percent)
    }
}

/// Percentage (0–100) from a stored fraction cell
fn percent_from_cell(value: &CellValue) -> f64 {
    let percent = match value {
        CellValue::Empty => 0.0,
        CellValue::Number(fraction) => fraction * 100.0,
        CellValue::Text(text) => {
            let text = text.trim();
            match text.strip_suffix('%') {
                Some(pct) => pct.trim().parse().unwrap_or(0.0),
                None => text.parse::<f64>().map_or(0.0, |fraction| fraction * 100.0),
            }
        }
    };
    // Undo float noise from the fraction round trip (0.575 * 100)
    clamp_percent((percent * 1e6).round() / 1e6)
}

/// Sub-header row with the canonical labels
#[must_use]
pub fn sub_header_row() -> Row {
    let mut row = Row::blank();
    row.set(col::CODE, CellValue::text(SUB_HEADER_LABELS[0]));
    row.set(col::DESCRIPTION, CellValue::text(SUB_HEADER_LABELS[1]));
    row.set(col::PERCENT, CellValue::text(SUB_HEADER_LABELS[2]));
    row
}

/// One gate block
#[derive(Debug, Clone, PartialEq)]
pub struct GateBlock {
    /// Header contents
    pub header: GateHeader,
    /// Non-blank rows that are neither sub-header nor data
    pub notes: Vec<Row>,
    /// Whether the block carries a sub-header row
    pub has_sub_header: bool,
    /// Data run in document order
    pub rows: Vec<DataRow>,
    /// Source rows (header through last row before the next block), if parsed
    pub source: Option<RangeInclusive<usize>>,
    /// Fully blank rows found in the source range
    pub blank_rows: usize,
    /// Whether the source range ended with a blank row
    pub ends_with_blank: bool,
}

impl GateBlock {
    /// New block with no rows
    #[must_use]
    pub fn new(header: GateHeader) -> Self {
        Self {
            header,
            notes: Vec::new(),
            has_sub_header: false,
            rows: Vec::new(),
            source: None,
            blank_rows: 0,
            ends_with_blank: false,
        }
    }

    /// Parse the block whose header is at `header_row`
    ///
    /// Returns `None` if `header_row` is not a gate header.
    #[must_use]
    pub fn parse(sheet: &Sheet, header_row: usize) -> Option<Self> {
        let header = GateHeader::from_row(sheet.row(header_row)?)?;
        let end_row = find_next_gate_row(sheet, header_row) - 1;

        let mut block = Self::new(header);
        block.source = Some(header_row..=end_row);

        let run = find_sub_header(sheet, header_row + 1, end_row)
            .map(|sub| (sub, find_block_end(sheet, sub)));
        block.has_sub_header = run.is_some();

        for row_idx in header_row + 1..=end_row {
            let Some(row) = sheet.row(row_idx) else { break };
            match run {
                Some((sub, _)) if row_idx == sub => {}
                Some((sub, end)) if row_idx > sub && row_idx <= end => {
                    block.rows.push(DataRow::from_row(row));
                }
                _ if row.is_blank() => block.blank_rows += 1,
                _ => block.notes.push(row.clone()),
            }
        }
        block.ends_with_blank = end_row > header_row && sheet.is_blank_row(end_row);

        Some(block)
    }

    /// Header row index in the source sheet
    #[inline]
    #[must_use]
    pub fn header_row(&self) -> Option<usize> {
        self.source.as_ref().map(|r| *r.start())
    }

    /// Source range ends with exactly one blank row and has no other blanks
    #[inline]
    #[must_use]
    pub fn has_single_spacer(&self) -> bool {
        self.blank_rows == 1 && self.ends_with_blank
    }

    /// Append data rows at the end of the run, creating the sub-header if needed
    pub fn append(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        self.has_sub_header = true;
        self.rows.extend(rows);
    }

    /// Replace the whole data run
    pub fn replace(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        self.has_sub_header = true;
        self.rows = rows.into_iter().collect();
    }

    /// Data rows as standard references
    #[must_use]
    pub fn standards(&self) -> Vec<StandardRef> {
        self.rows.iter().map(StandardRef::from).collect()
    }

    /// Render header, notes, sub-header and data run (no spacer)
    #[must_use]
    pub fn render(&self) -> Vec<Row> {
        let mut out = Vec::with_capacity(2 + self.notes.len() + self.rows.len());
        out.push(self.header.to_row());
        out.extend(self.notes.iter().cloned());
        if self.has_sub_header || !self.rows.is_empty() {
            out.push(sub_header_row());
            out.extend(self.rows.iter().map(DataRow::to_row));
        }
        out
    }
}

/// Structural problem found by [`GateDocument::violations`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Block is not followed by a blank spacer row
    #[error("gate at row {gate_row} is missing its spacer row")]
    MissingSpacer {
        /// Header row of the block
        gate_row: usize,
    },
    /// Block contains more than one blank row
    #[error("gate at row {gate_row} has {count} blank rows, expected 1")]
    ExtraBlankRows {
        /// Header row of the block
        gate_row: usize,
        /// Number of blank rows found
        count: usize,
    },
    /// Two blocks share the same gate number and title
    #[error("duplicate gate {number} '{title}' at rows {rows:?}")]
    DuplicateGate {
        /// Gate number
        number: u64,
        /// Title (as first seen)
        title: String,
        /// Header rows carrying the pair
        rows: Vec<usize>,
    },
}

/// Whole document: preamble rows plus gate blocks in order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GateDocument {
    /// Rows before the first gate header (column labels etc.)
    pub preamble: Vec<Row>,
    /// Gate blocks in document order
    pub blocks: Vec<GateBlock>,
}

impl GateDocument {
    /// Parse a sheet
    #[must_use]
    pub fn parse(sheet: &Sheet) -> Self {
        let first_gate = find_next_gate_row(sheet, 0);
        let preamble = (1..first_gate)
            .filter_map(|r| sheet.row(r).cloned())
            .collect();

        let mut blocks = Vec::new();
        let mut cursor = first_gate;
        while cursor <= sheet.last_row() {
            if let Some(block) = GateBlock::parse(sheet, cursor) {
                blocks.push(block);
            }
            cursor = find_next_gate_row(sheet, cursor);
        }

        Self { preamble, blocks }
    }

    /// Render into a normalized sheet (exactly one spacer after each block)
    #[must_use]
    pub fn render(&self) -> Sheet {
        let mut rows = self.preamble.clone();
        for block in &self.blocks {
            rows.extend(block.render());
            rows.push(Row::blank());
        }
        Sheet::from_rows(rows)
    }

    /// Locate a block by gate number or case-insensitive title
    #[must_use]
    pub fn find_gate(&self, gate_id: &str) -> Option<&GateBlock> {
        let gate_id = gate_id.trim();
        if let Ok(number) = gate_id.parse::<u64>() {
            if let Some(block) = self.blocks.iter().find(|b| b.header.number == number) {
                return Some(block);
            }
        }
        self.blocks.iter().find(|b| b.header.title_matches(gate_id))
    }

    /// Locate the block of one checklist: title must match and, for a
    /// numeric `gate_id`, so must the gate number
    ///
    /// A non-numeric `gate_id` resolves only when exactly one block carries
    /// the title.
    #[must_use]
    pub fn find_block(&self, gate_id: &str, checklist_title: &str) -> Option<&GateBlock> {
        let mut candidates = self
            .blocks
            .iter()
            .filter(|b| b.header.title_matches(checklist_title));
        match gate_id.trim().parse::<u64>() {
            Ok(number) => candidates.find(|b| b.header.number == number),
            Err(_) => {
                let first = candidates.next()?;
                candidates.next().is_none().then_some(first)
            }
        }
    }

    /// All structural invariant violations
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut gates: BTreeMap<(u64, String), (String, Vec<usize>)> = BTreeMap::new();

        for block in &self.blocks {
            let gate_row = block.header_row().unwrap_or_default();

            if !block.ends_with_blank {
                violations.push(Violation::MissingSpacer { gate_row });
            } else if block.blank_rows > 1 {
                violations.push(Violation::ExtraBlankRows {
                    gate_row,
                    count: block.blank_rows,
                });
            }

            gates
                .entry((block.header.number, block.header.title.trim().to_lowercase()))
                .or_insert_with(|| (block.header.title.clone(), Vec::new()))
                .1
                .push(gate_row);
        }

        violations.extend(
            gates
                .into_iter()
                .filter(|(_, (_, rows))| rows.len() > 1)
                .map(|((number, _), (title, rows))| Violation::DuplicateGate {
                    number,
                    title,
                    rows,
                }),
        );
        violations
    }
}

impl fmt::Display for GateDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(
                f,
                "{} {} ({} standards)",
                block.header.number,
                block.header.title,
                block.rows.len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet() -> Sheet {
        Sheet::from_rows(vec![
            Row::from_texts(&["Gate", "GateTitle", "Description"]),
            Row::from_texts(&["1", "Intake", "Scoping"]),
            Row::from_texts(&["", "code", "description", "percentage"]),
            DataRow {
                code: "A-1".into(),
                description: "alpha".into(),
                percent: 57.5,
            }
            .to_row(),
            Row::blank(),
            Row::from_texts(&["2", "Design"]),
            Row::blank(),
            Row::blank(),
        ])
    }

    #[test]
    fn parses_blocks_and_preamble() {
        let doc = GateDocument::parse(&sheet());
        assert_eq!(doc.preamble.len(), 1);
        assert_eq!(doc.blocks.len(), 2);

        let intake = &doc.blocks[0];
        assert_eq!(intake.header.number, 1);
        assert_eq!(intake.header.description, "Scoping");
        assert!(intake.has_sub_header);
        assert_eq!(intake.rows.len(), 1);
        assert_eq!(intake.rows[0].percent, 57.5);
        assert!(intake.has_single_spacer());
        assert_eq!(intake.source, Some(2..=5));

        let design = &doc.blocks[1];
        assert!(!design.has_sub_header);
        assert_eq!(design.blank_rows, 2);
    }

    #[test]
    fn violations_report_extra_blank_rows() {
        let doc = GateDocument::parse(&sheet());
        assert_eq!(
            doc.violations(),
            vec![Violation::ExtraBlankRows {
                gate_row: 6,
                count: 2
            }]
        );
    }

    #[test]
    fn render_normalizes_spacers() {
        let rendered = GateDocument::parse(&sheet()).render();
        let doc = GateDocument::parse(&rendered);
        assert!(doc.violations().is_empty());
        assert_eq!(rendered.last_row(), 7);
    }

    #[test]
    fn missing_spacer_and_duplicates_detected() {
        let sheet = Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["1", "intake"]),
            Row::blank(),
        ]);
        let violations = GateDocument::parse(&sheet).violations();

        assert!(violations.contains(&Violation::MissingSpacer { gate_row: 1 }));
        assert!(violations.contains(&Violation::DuplicateGate {
            number: 1,
            title: "Intake".to_string(),
            rows: vec![1, 2]
        }));
    }

    #[test]
    fn checklists_may_share_a_gate_number() {
        let sheet = Sheet::from_rows(vec![
            Row::from_texts(&["1", "Scope"]),
            Row::blank(),
            Row::from_texts(&["1", "Budget"]),
            Row::blank(),
            Row::from_texts(&["2", "Scope"]),
            Row::blank(),
        ]);
        let doc = GateDocument::parse(&sheet);
        assert!(doc.violations().is_empty());

        assert_eq!(doc.find_block("1", "budget").unwrap().header_row(), Some(3));
        assert_eq!(doc.find_block(" 2 ", "Scope").unwrap().header_row(), Some(5));
        assert!(doc.find_block("3", "Scope").is_none());
        // Ambiguous without a number
        assert!(doc.find_block("gate", "Scope").is_none());
        assert_eq!(doc.find_block("gate", "Budget").unwrap().header_row(), Some(3));
    }

    #[test]
    fn stray_rows_become_notes() {
        let sheet = Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["", "", "remember the vendor audit"]),
            Row::blank(),
        ]);
        let block = GateBlock::parse(&sheet, 1).unwrap();
        assert_eq!(block.notes.len(), 1);
        assert!(block.rows.is_empty());

        let rendered = block.render();
        assert_eq!(rendered.len(), 2);
    }

    #[test]
    fn find_gate_by_number_or_title() {
        let doc = GateDocument::parse(&sheet());
        assert_eq!(doc.find_gate("2").unwrap().header.title, "Design");
        assert_eq!(doc.find_gate(" intake ").unwrap().header.number, 1);
        assert!(doc.find_gate("Launch").is_none());
    }

    #[test]
    fn percent_cells_decode() {
        assert_eq!(percent_from_cell(&CellValue::Number(0.575)), 57.5);
        assert_eq!(percent_from_cell(&CellValue::Text("40%".into())), 40.0);
        assert_eq!(percent_from_cell(&CellValue::Text("0.25".into())), 25.0);
        assert_eq!(percent_from_cell(&CellValue::Text("n/a".into())), 0.0);
        assert_eq!(percent_from_cell(&CellValue::Number(3.0)), 100.0);
    }

    #[test]
    fn data_row_writes_fraction_with_percent_format() {
        let row = DataRow::from(&StandardRef::new(" A-1 ", "alpha", 150.0)).to_row();
        assert_eq!(row.text(col::CODE), "A-1");
        assert_eq!(row.cell(col::PERCENT).value, CellValue::Number(1.0));
        assert_eq!(row.cell(col::PERCENT).format, Some(NumberFormat::Percent));
    }
}
