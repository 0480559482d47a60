//! Reader for the formats calamine understands (xls, xlsb, ods)
//!
//! Sheet states come from calamine's sheet metadata. For ODS the hidden rows,
//! hidden columns and merged cells are read from `content.xml` as well; the
//! binary formats expose values and formulas only.

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, SheetType, SheetVisible, Sheets, open_workbook_auto};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::ods_parser::{SheetLayout, read_ods_layouts};
use super::parser_utils::parse_iso_datetime;
use super::{Cell, CellAddress, CellValue, ContentClass, Sheet, SheetState, WorkbookReader};

pub struct CalamineReader {
    workbook: Sheets<BufReader<File>>,
    layouts: HashMap<String, SheetLayout>,
}

impl CalamineReader {
    pub fn open(path: &Path) -> Result<Self> {
        let workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let layouts = if is_ods(path) {
            let file = File::open(path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            let mut archive = ZipArchive::new(BufReader::new(file))
                .with_context(|| format!("Failed to open zip archive: {}", path.display()))?;
            read_ods_layouts(&mut archive)
                .with_context(|| format!("Failed to read sheet layout: {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self { workbook, layouts })
    }
}

impl WorkbookReader for CalamineReader {
    fn read_sheets(&mut self) -> Result<Vec<Sheet>> {
        let mut sheets = Vec::new();

        for meta in self.workbook.sheets_metadata().to_vec() {
            if !matches!(meta.typ, SheetType::WorkSheet) {
                debug!(sheet = %meta.name, "skipping non-worksheet");
                continue;
            }
            let name = meta.name;
            let range = self
                .workbook
                .worksheet_range(&name)
                .with_context(|| format!("Failed to read sheet '{}'", name))?;

            let mut sheet = Sheet::new(name.as_str());
            sheet.state = sheet_state(meta.visible);
            fill_values(&mut sheet, &range);

            // Formula extraction is not supported by every backend
            match self.workbook.worksheet_formula(&name) {
                Ok(formulas) => mark_formulas(&mut sheet, &formulas),
                Err(e) => warn!(sheet = %name, "formulas unavailable: {:?}", e),
            }

            if let Some(layout) = self.layouts.remove(&name) {
                layout.apply(&mut sheet);
            }

            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// First sheet of a workbook together with the text of its formulas
#[derive(Debug, Clone, Default)]
pub struct SourceSheet {
    pub sheet: Sheet,
    /// Formula text without the leading `=`, by cell
    pub formulas: BTreeMap<CellAddress, String>,
}

/// Read the first sheet of a workbook: values, plus formulas written in A1 syntax.
///
/// ODS formulas use OpenFormula references (`[.A1]`), so ODS sources keep
/// their cached values only.
pub fn read_first_sheet(path: &Path) -> Result<Option<SourceSheet>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let Some(name) = workbook.sheet_names().first().cloned() else {
        return Ok(None);
    };
    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Failed to read sheet '{}' of {}", name, path.display()))?;

    let mut sheet = Sheet::new(name.as_str());
    fill_values(&mut sheet, &range);

    let formulas = if is_ods(path) {
        BTreeMap::new()
    } else {
        match workbook.worksheet_formula(&name) {
            Ok(range) => formula_cells(&range),
            Err(e) => {
                warn!(path = %path.display(), "formulas unavailable: {:?}", e);
                BTreeMap::new()
            }
        }
    };

    Ok(Some(SourceSheet { sheet, formulas }))
}

fn is_ods(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ods"))
}

fn sheet_state(visible: SheetVisible) -> SheetState {
    match visible {
        SheetVisible::Visible => SheetState::Normal,
        SheetVisible::Hidden => SheetState::Hidden,
        SheetVisible::VeryHidden => SheetState::VeryHidden,
    }
}

/// Absolute 1-based address of a cell at a position relative to the range start
fn absolute_address(start: (u32, u32), row: usize, col: usize) -> CellAddress {
    CellAddress::at(start.0 + row as u32 + 1, start.1 + col as u32 + 1)
}

fn fill_values(sheet: &mut Sheet, range: &Range<Data>) {
    let Some(start) = range.start() else {
        return;
    };

    for (r, row) in range.rows().enumerate() {
        for (c, data) in row.iter().enumerate() {
            if matches!(data, Data::Empty) {
                continue;
            }
            let value = parse_cell_value(data);
            let cell = if value.is_error() {
                Cell {
                    value,
                    class: ContentClass::Error,
                }
            } else {
                Cell::literal(value)
            };
            sheet.set_cell(absolute_address(start, r, c), cell);
        }
    }
}

/// Non-empty formulas of a range keyed by absolute address
fn formula_cells(formulas: &Range<String>) -> BTreeMap<CellAddress, String> {
    let Some(start) = formulas.start() else {
        return BTreeMap::new();
    };

    let mut cells = BTreeMap::new();
    for (r, row) in formulas.rows().enumerate() {
        for (c, formula) in row.iter().enumerate() {
            let text = formula.trim_start_matches('=');
            if !text.is_empty() {
                cells.insert(absolute_address(start, r, c), text.to_string());
            }
        }
    }
    cells
}

fn mark_formulas(sheet: &mut Sheet, formulas: &Range<String>) {
    for address in formula_cells(formulas).into_keys() {
        let cached = sheet.cell(address).value.clone();
        sheet.set_cell(address, Cell::formula(cached));
    }
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        // Honors the workbook's 1900/1904 date system
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
