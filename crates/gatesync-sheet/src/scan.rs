//! Positional scans over a [`Sheet`]
//!
//! Linear row-by-row searches for the structural markers of the document.
//! Documents hold tens of gate blocks, so no index is kept.

use crate::sheet::Sheet;

/// First gate header strictly after `from_row`, or `last_row + 1` if none
#[must_use]
pub fn find_next_gate_row(sheet: &Sheet, from_row: usize) -> usize {
    (from_row + 1..=sheet.last_row())
        .find(|&row| sheet.is_gate_row(row))
        .unwrap_or(sheet.last_row() + 1)
}

/// Sub-header row within `start_row..=end_row`, if any
#[must_use]
pub fn find_sub_header(sheet: &Sheet, start_row: usize, end_row: usize) -> Option<usize> {
    let end_row = end_row.min(sheet.last_row());
    (start_row.max(1)..=end_row).find(|&row| sheet.row(row).is_some_and(|r| r.is_sub_header()))
}

/// Last data row of the run that starts below `sub_header_row`
///
/// Scans forward until the next gate header or fully blank row and returns
/// the row just before that boundary. A run with no data rows yields
/// `sub_header_row` itself.
#[must_use]
pub fn find_block_end(sheet: &Sheet, sub_header_row: usize) -> usize {
    let mut row = sub_header_row + 1;
    while row <= sheet.last_row() && !sheet.is_gate_row(row) && !sheet.is_blank_row(row) {
        row += 1;
    }
    row - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Row;

    // 1: labels, 2: gate 1, 3: sub-header, 4-5: data, 6: blank, 7: gate 2, 8: blank
    fn sample() -> Sheet {
        Sheet::from_rows(vec![
            Row::from_texts(&["Gate", "GateTitle", "Description"]),
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["", "code", "description", "percentage"]),
            Row::from_texts(&["", "A-1", "alpha"]),
            Row::from_texts(&["", "B-2", "beta"]),
            Row::blank(),
            Row::from_texts(&["2", "Design"]),
            Row::blank(),
        ])
    }

    #[test]
    fn next_gate_row_skips_current() {
        let sheet = sample();
        assert_eq!(find_next_gate_row(&sheet, 0), 2);
        assert_eq!(find_next_gate_row(&sheet, 2), 7);
        assert_eq!(find_next_gate_row(&sheet, 7), 9);
    }

    #[test]
    fn next_gate_row_on_empty_sheet() {
        assert_eq!(find_next_gate_row(&Sheet::new(), 0), 1);
    }

    #[test]
    fn sub_header_in_range() {
        let sheet = sample();
        assert_eq!(find_sub_header(&sheet, 3, 6), Some(3));
        assert_eq!(find_sub_header(&sheet, 8, 20), None);
        assert_eq!(find_sub_header(&sheet, 4, 6), None);
    }

    #[test]
    fn block_end_stops_at_blank() {
        assert_eq!(find_block_end(&sample(), 3), 5);
    }

    #[test]
    fn block_end_stops_at_gate_header() {
        let sheet = Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["", "code", "description", "percentage"]),
            Row::from_texts(&["", "A-1", "alpha"]),
            Row::from_texts(&["2", "Design"]),
        ]);
        assert_eq!(find_block_end(&sheet, 2), 3);
    }

    #[test]
    fn block_end_of_empty_run_is_sub_header() {
        let sheet = Sheet::from_rows(vec![
            Row::from_texts(&["1", "Intake"]),
            Row::from_texts(&["", "code", "description", "percentage"]),
        ]);
        assert_eq!(find_block_end(&sheet, 2), 2);
    }
}
