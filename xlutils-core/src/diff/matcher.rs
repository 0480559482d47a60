//! Sheet alignment between two workbooks

use crate::reader::Workbook;
use tracing::debug;

/// Names of the sheets to compare, in the base workbook's order.
///
/// A sheet is skipped when the target lacks it or when either side hides it.
pub fn matching_sheets<'a>(base: &'a Workbook, target: &Workbook) -> Vec<&'a str> {
    base.sheets
        .iter()
        .filter(|sheet| {
            let Some(other) = target.get_sheet(&sheet.name) else {
                debug!(sheet = %sheet.name, "skipping sheet missing from target");
                return false;
            };
            if !sheet.is_visible() || !other.is_visible() {
                debug!(sheet = %sheet.name, "skipping hidden sheet");
                return false;
            }
            true
        })
        .map(|sheet| sheet.name.as_str())
        .collect()
}
