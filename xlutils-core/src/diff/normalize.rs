//! Comparable text for a cell

use super::visibility::is_hidden;
use crate::reader::{Cell, CellAddress, CellValue, Sheet};

/// Rendering of an absent value that still counts as a literal
pub const NO_VALUE_TEXT: &str = "None";

/// Text compared for the cell at `address`.
///
/// Hidden cells and cells whose content class is masked yield an empty string.
pub fn normalize(sheet: &Sheet, address: CellAddress, cell: &Cell) -> String {
    if is_hidden(sheet, address) || cell.class.is_masked() {
        return String::new();
    }
    render_value(&cell.value)
}

/// Locale-independent rendering of a raw value
pub fn render_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => NO_VALUE_TEXT.to_string(),
        CellValue::Number(n) => render_number(*n),
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(true) => "TRUE".to_string(),
        CellValue::Boolean(false) => "FALSE".to_string(),
        CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        CellValue::Error(code) => code.clone(),
    }
}

fn render_number(n: f64) -> String {
    if n == 0.0 {
        // Covers negative zero
        return "0".to_string();
    }
    n.to_string()
}
