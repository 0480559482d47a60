//! Cell-by-cell comparison of two sheets

use super::normalize::normalize;
use crate::reader::{CellAddress, Sheet};
use crate::report::DifferenceRecord;

/// Compare two sheets over the union of their bounds.
///
/// Cells are visited row by row, left to right. Records carry the first
/// sheet's name.
pub fn diff_sheets(base: &Sheet, target: &Sheet) -> Vec<DifferenceRecord> {
    let max_row = base.max_row.max(target.max_row);
    let max_col = base.max_col.max(target.max_col);
    let mut records = Vec::new();

    for row in 1..=max_row {
        for col in 1..=max_col {
            let address = CellAddress::at(row, col);
            let value1 = normalize(base, address, base.cell(address));
            let value2 = normalize(target, address, target.cell(address));
            if value1 != value2 {
                records.push(DifferenceRecord {
                    sheet: base.name.clone(),
                    cell: address.to_a1(),
                    value1,
                    value2,
                });
            }
        }
    }

    records
}
