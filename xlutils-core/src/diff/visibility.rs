//! Hidden-cell detection through merged ranges

use crate::reader::{CellAddress, MergedRange, Sheet};

/// Whether `address` is hidden from view.
///
/// Only the first merged range containing the address is consulted. The
/// address is hidden when any row or column spanned by that range is hidden.
/// Addresses outside every merged range are never hidden.
pub fn is_hidden(sheet: &Sheet, address: CellAddress) -> bool {
    sheet
        .merged_ranges
        .iter()
        .find(|range| range.contains(address))
        .is_some_and(|range| range_touches_hidden(sheet, range))
}

fn range_touches_hidden(sheet: &Sheet, range: &MergedRange) -> bool {
    sheet.hidden_rows.range(range.rows()).next().is_some()
        || sheet.hidden_columns.range(range.columns()).next().is_some()
}
