//! Comparison engine
//!
//! Sheets are matched by name, then compared cell by cell on their normalized
//! text. Hidden merged cells and non-literal content never register as changes.

pub mod grid;
pub mod matcher;
pub mod normalize;
pub mod visibility;

pub use grid::diff_sheets;
pub use matcher::matching_sheets;
pub use normalize::{NO_VALUE_TEXT, normalize, render_value};
pub use visibility::is_hidden;

use crate::reader::Workbook;
use crate::report::DifferenceRecord;
use tracing::debug;

/// All differences between two workbooks, sheet by sheet in base order
pub fn diff_workbooks(base: &Workbook, target: &Workbook) -> Vec<DifferenceRecord> {
    let mut records = Vec::new();

    for name in matching_sheets(base, target) {
        let (Some(left), Some(right)) = (base.get_sheet(name), target.get_sheet(name)) else {
            continue;
        };
        let sheet_records = diff_sheets(left, right);
        debug!(sheet = name, differences = sheet_records.len(), "compared sheet");
        records.extend(sheet_records);
    }

    records
}
