//! Workbook data structures

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use thiserror::Error;

use super::parser_utils::{column_letters, parse_cell_ref};

/// Errors raised when building addresses from raw coordinates or references
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("cell coordinates are 1-indexed, got row {row} column {col}")]
    ZeroCoordinate { row: u32, col: u32 },
    #[error("invalid cell reference '{0}'")]
    InvalidReference(String),
    #[error("invalid cell range '{0}'")]
    InvalidRange(String),
}

/// A 1-indexed cell coordinate (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellAddress {
    row: u32,
    col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Result<Self, AddressError> {
        if row == 0 || col == 0 {
            return Err(AddressError::ZeroCoordinate { row, col });
        }
        Ok(Self { row, col })
    }

    /// Build an address from coordinates already known to be 1-indexed
    pub(crate) fn at(row: u32, col: u32) -> Self {
        debug_assert!(row > 0 && col > 0, "coordinates are 1-indexed");
        Self { row, col }
    }

    /// Parse an A1-style reference such as "B12" (absolute markers allowed)
    pub fn parse(cell_ref: &str) -> Result<Self, AddressError> {
        let (row, col) = parse_cell_ref(cell_ref)
            .ok_or_else(|| AddressError::InvalidReference(cell_ref.to_string()))?;
        Self::new(row, col)
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Excel-style reference (e.g., "A1")
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// A rectangular block of cells presented as a single cell anchored at `first`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    first: CellAddress,
    last: CellAddress,
}

impl MergedRange {
    /// Corners may be given in any order; they are normalized to top-left / bottom-right
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            first: CellAddress::at(a.row.min(b.row), a.col.min(b.col)),
            last: CellAddress::at(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse a range like "A1:C3"; a single reference is a 1x1 range
    pub fn parse(range: &str) -> Result<Self, AddressError> {
        match range.split_once(':') {
            Some((start, end)) => {
                let start = CellAddress::parse(start)
                    .map_err(|_| AddressError::InvalidRange(range.to_string()))?;
                let end = CellAddress::parse(end)
                    .map_err(|_| AddressError::InvalidRange(range.to_string()))?;
                Ok(Self::new(start, end))
            }
            None => {
                let single = CellAddress::parse(range)
                    .map_err(|_| AddressError::InvalidRange(range.to_string()))?;
                Ok(Self::new(single, single))
            }
        }
    }

    /// Top-left (anchor) cell
    pub fn first(&self) -> CellAddress {
        self.first
    }

    /// Bottom-right cell
    pub fn last(&self) -> CellAddress {
        self.last
    }

    pub fn contains(&self, address: CellAddress) -> bool {
        (self.first.row..=self.last.row).contains(&address.row)
            && (self.first.col..=self.last.col).contains(&address.col)
    }

    pub fn rows(&self) -> RangeInclusive<u32> {
        self.first.row..=self.last.row
    }

    pub fn columns(&self) -> RangeInclusive<u32> {
        self.first.col..=self.last.col
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

/// Sheet visibility as declared in the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetState {
    #[default]
    Normal,
    Hidden,
    VeryHidden,
}

impl SheetState {
    /// Map the `state` attribute of a `<sheet>` element
    pub fn from_attr(state: &str) -> Self {
        match state {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Normal,
        }
    }

    pub fn is_hidden(&self) -> bool {
        !matches!(self, SheetState::Normal)
    }
}

/// Represents a complete workbook
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names in declared order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// File name without extension, used to label reports
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Represents a worksheet
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub state: SheetState,
    pub cells: HashMap<CellAddress, Cell>,
    /// Largest populated row (0 when the sheet has no cells)
    pub max_row: u32,
    /// Largest populated column (0 when the sheet has no cells)
    pub max_col: u32,
    /// Hidden row numbers (1-based)
    pub hidden_rows: BTreeSet<u32>,
    /// Hidden column numbers (1-based)
    pub hidden_columns: BTreeSet<u32>,
    /// Merged ranges in declared order
    pub merged_ranges: Vec<MergedRange>,
}

static EMPTY_CELL: Cell = Cell {
    value: CellValue::Empty,
    class: ContentClass::Empty,
};

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the cell at `address`, or an empty cell when nothing is stored there
    pub fn cell(&self, address: CellAddress) -> &Cell {
        self.cells.get(&address).unwrap_or(&EMPTY_CELL)
    }

    /// Store a cell, growing the occupied bounds as needed
    pub fn set_cell(&mut self, address: CellAddress, cell: Cell) {
        self.max_row = self.max_row.max(address.row);
        self.max_col = self.max_col.max(address.col);
        self.cells.insert(address, cell);
    }

    pub fn is_visible(&self) -> bool {
        !self.state.is_hidden()
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    pub fn is_column_hidden(&self, col: u32) -> bool {
        self.hidden_columns.contains(&col)
    }

    /// Occupied bounds as (max_row, max_col)
    pub fn bounds(&self) -> (u32, u32) {
        (self.max_row, self.max_col)
    }
}

/// Declared kind of a cell, deciding whether its value takes part in comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentClass {
    #[default]
    Empty,
    Error,
    Formula,
    /// Cached string result of a formula (`t="str"`)
    FormulaDisplayText,
    Literal,
}

impl ContentClass {
    /// Whether values of this class are replaced by an empty string before comparing
    pub fn is_masked(&self) -> bool {
        !matches!(self, ContentClass::Literal)
    }
}

/// Represents a single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub class: ContentClass,
}

impl Cell {
    /// A plain stored value
    pub fn literal(value: CellValue) -> Self {
        let class = if value.is_empty() {
            ContentClass::Empty
        } else {
            ContentClass::Literal
        };
        Self { value, class }
    }

    /// A formula cell with its cached result
    pub fn formula(cached: CellValue) -> Self {
        Self {
            value: cached,
            class: ContentClass::Formula,
        }
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}
