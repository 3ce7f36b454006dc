//! Tabular persistence layer
//!
//! A [`Sheet`] is an ordered list of fixed-width [`Row`]s addressed with
//! 1-based row and column indices, the way the persisted document is laid out:
//!
//! | col | gate header | sub-header / data row |
//! |-----|-------------|-----------------------|
//! | 1   | gate number | (empty)               |
//! | 2   | title       | code                  |
//! | 3   | description | description           |
//! | 4   | status      | percentage (fraction) |
//! | 5   | assigned to |                       |
//! | 6   | due date    |                       |
//! | 7   | feedback    |                       |

use crate::error::DocumentError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// Number of columns in every row
pub const COLUMN_COUNT: usize = 7;

/// Column indices (1-based)
pub mod col {
    /// Gate number
    pub const GATE: usize = 1;
    /// Gate title / standard code
    pub const TITLE: usize = 2;
    /// Standard code (shares column with the gate title)
    pub const CODE: usize = 2;
    /// Description
    pub const DESCRIPTION: usize = 3;
    /// Gate status
    pub const STATUS: usize = 4;
    /// Weight percentage (shares column with the gate status)
    pub const PERCENT: usize = 4;
    /// Assignee
    pub const ASSIGNED_TO: usize = 5;
    /// Due date
    pub const DUE_DATE: usize = 6;
    /// Feedback
    pub const FEEDBACK: usize = 7;
}

/// Labels of the column header row written when seeding
pub const SEED_LABELS: [&str; COLUMN_COUNT] = [
    "Gate",
    "GateTitle",
    "Description",
    "Status",
    "Assigned To",
    "Due Date",
    "Feedback",
];

/// Labels written into columns 2–4 of a sub-header row
pub const SUB_HEADER_LABELS: [&str; 3] = ["code", "description", "percentage"];

/// Accepted spellings of the percentage sub-header label
const PERCENT_LABELS: [&str; 3] = ["percentage", "weight %", "weight%"];

static GATE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("static regex"));

/// Display format of a numeric cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    /// Fraction rendered as a whole percentage (`0%`)
    #[serde(rename = "0%")]
    Percent,
}

impl NumberFormat {
    /// Render a value in this format
    #[must_use]
    pub fn render(self, value: f64) -> String {
        match self {
            Self::Percent => format!("{:.0}%", value * 100.0),
        }
    }
}

/// Raw cell value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value
    #[default]
    Empty,
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
}

impl CellValue {
    /// Text cell, or empty if `text` is blank
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }
}

/// A single cell: value plus optional number format
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Cell value
    #[serde(default)]
    pub value: CellValue,
    /// Number format applied to the cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<NumberFormat>,
}

impl Cell {
    /// Cell as plain text (numbers without a fractional part drop the `.0`)
    #[must_use]
    pub fn as_text(&self) -> String {
        match &self.value {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            CellValue::Number(n) => n.to_string(),
        }
    }

    /// Cell as it would be displayed (number formats applied)
    #[must_use]
    pub fn display(&self) -> String {
        match (&self.value, self.format) {
            (CellValue::Number(n), Some(format)) => format.render(*n),
            _ => self.as_text(),
        }
    }

    /// True if the cell holds no visible content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_text().is_empty()
    }
}

/// One sheet row of [`COLUMN_COUNT`] cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Cell>", into = "Vec<Cell>")]
pub struct Row {
    cells: [Cell; COLUMN_COUNT],
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        let mut row = Row::blank();
        for (slot, cell) in row.cells.iter_mut().zip(cells) {
            *slot = cell;
        }
        row
    }
}

impl From<Row> for Vec<Cell> {
    fn from(row: Row) -> Self {
        row.cells.into()
    }
}

impl Row {
    /// Fully blank row
    #[inline]
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Row of text cells starting at column 1
    #[must_use]
    pub fn from_texts(texts: &[&str]) -> Self {
        let mut row = Self::blank();
        for (column, text) in (1..=COLUMN_COUNT).zip(texts) {
            row.set(column, CellValue::text(*text));
        }
        row
    }

    /// Cell at 1-based column
    ///
    /// # Panics
    /// If `column` is outside `1..=COLUMN_COUNT`
    #[inline]
    #[must_use]
    pub fn cell(&self, column: usize) -> &Cell {
        &self.cells[column - 1]
    }

    /// Text of the cell at 1-based column
    #[inline]
    #[must_use]
    pub fn text(&self, column: usize) -> String {
        self.cell(column).as_text()
    }

    /// Set value at 1-based column, keeping its format
    #[inline]
    pub fn set(&mut self, column: usize, value: CellValue) {
        self.cells[column - 1].value = value;
    }

    /// Set number format at 1-based column
    #[inline]
    pub fn set_format(&mut self, column: usize, format: Option<NumberFormat>) {
        self.cells[column - 1].format = format;
    }

    /// Fully blank: gate-number, title and description cells are all empty
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [col::GATE, col::TITLE, col::DESCRIPTION]
            .iter()
            .all(|&c| self.cell(c).is_empty())
    }

    /// Gate header: column 1 is all digits and column 2 is non-empty
    #[must_use]
    pub fn is_gate_header(&self) -> bool {
        GATE_NUMBER.is_match(&self.text(col::GATE)) && !self.cell(col::TITLE).is_empty()
    }

    /// Sub-header: columns 2–4 read `code`, `description`, `percentage`
    /// (case-insensitive; `weight %` / `weight%` accepted for the last)
    #[must_use]
    pub fn is_sub_header(&self) -> bool {
        let code = self.text(col::CODE);
        let description = self.text(col::DESCRIPTION);
        let percent = self.text(col::PERCENT);

        code.eq_ignore_ascii_case(SUB_HEADER_LABELS[0])
            && description.eq_ignore_ascii_case(SUB_HEADER_LABELS[1])
            && PERCENT_LABELS
                .iter()
                .any(|label| percent.eq_ignore_ascii_case(label))
    }

    /// Display strings of all cells
    #[must_use]
    pub fn display(&self) -> Vec<String> {
        self.cells.iter().map(Cell::display).collect()
    }
}

/// Ordered rows of the persisted document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sheet {
    rows: Vec<Row>,
}

impl Sheet {
    /// Create empty sheet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create sheet from rows
    #[inline]
    #[must_use]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Index of the last row (0 for an empty sheet)
    #[inline]
    #[must_use]
    pub fn last_row(&self) -> usize {
        self.rows.len()
    }

    /// True if the sheet has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at 1-based index
    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&Row> {
        row.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Mutable row at 1-based index
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        row.checked_sub(1).and_then(move |i| self.rows.get_mut(i))
    }

    /// All rows
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row at the end
    #[inline]
    pub fn append_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Insert rows so the first inserted row lands at `after + 1`
    ///
    /// `after` may be 0 (insert at the top) up to `last_row()` (append).
    pub fn insert_rows_after(&mut self, after: usize, rows: impl IntoIterator<Item = Row>) {
        let at = after.min(self.rows.len());
        self.rows.splice(at..at, rows);
    }

    /// Replace rows `range` (1-based, inclusive) with `rows`
    pub fn splice_rows(&mut self, range: RangeInclusive<usize>, rows: impl IntoIterator<Item = Row>) {
        let start = range.start().saturating_sub(1).min(self.rows.len());
        let end = (*range.end()).min(self.rows.len()).max(start);
        self.rows.splice(start..end, rows);
    }

    /// Apply `format` to `column` on rows `first..=last`
    pub fn set_number_format(
        &mut self,
        first: usize,
        last: usize,
        column: usize,
        format: Option<NumberFormat>,
    ) {
        for row in first..=last {
            if let Some(r) = self.row_mut(row) {
                r.set_format(column, format);
            }
        }
    }

    /// True if `row` exists and is fully blank
    #[inline]
    #[must_use]
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.row(row).is_some_and(Row::is_blank)
    }

    /// True if `row` exists and is a gate header
    #[inline]
    #[must_use]
    pub fn is_gate_row(&self, row: usize) -> bool {
        self.row(row).is_some_and(Row::is_gate_header)
    }

    /// Load sheet from a JSON file; a missing file yields an empty sheet
    ///
    /// # Errors
    /// - [`DocumentError::Io`] if the file cannot be read
    /// - [`DocumentError::Serialization`] if it is not a valid sheet
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(DocumentError::io_error(path, e)),
        }
    }

    /// Save sheet as pretty JSON
    ///
    /// # Errors
    /// [`DocumentError::Io`] if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).map_err(|e| DocumentError::io_error(path, e))
    }
}
