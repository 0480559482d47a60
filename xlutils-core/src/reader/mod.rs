//! Workbook reader: custom XML parsers for XLSX, calamine for the other formats

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

pub mod calamine_reader;
pub mod ods_parser;
pub mod parser_utils;
pub mod workbook;
pub mod xlsx_parser;

use self::calamine_reader::CalamineReader;
use self::xlsx_parser::XlsxReader;
pub use workbook::{
    AddressError, Cell, CellAddress, CellValue, ContentClass, MergedRange, Sheet, SheetState,
    Workbook,
};

/// Loader failures that are not plain I/O or XML errors
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Missing part '{0}' in workbook archive")]
    MissingPart(String),
}

/// Trait for spreadsheet format readers
pub trait WorkbookReader {
    fn read_sheets(&mut self) -> Result<Vec<Sheet>>;
}

/// Container formats understood by [`read_workbook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Office Open XML parsed with full visibility metadata
    Xlsx,
    /// Formats read through calamine (values and formulas only)
    Calamine,
}

impl WorkbookFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(WorkbookFormat::Xlsx),
            "xls" | "xlsb" | "xla" | "xlam" | "ods" => Some(WorkbookFormat::Calamine),
            _ => None,
        }
    }
}

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path_ref = path.as_ref();

    let format = WorkbookFormat::from_path(path_ref)
        .ok_or_else(|| ReadError::UnsupportedFormat(path_ref.display().to_string()))?;

    let sheets = match format {
        WorkbookFormat::Xlsx => {
            let file = File::open(path_ref)
                .with_context(|| format!("Failed to open file: {}", path_ref.display()))?;
            let mut archive = ZipArchive::new(BufReader::new(file))
                .with_context(|| format!("Failed to open zip archive: {}", path_ref.display()))?;
            XlsxReader::new(&mut archive)?.read_sheets()?
        }
        WorkbookFormat::Calamine => CalamineReader::open(path_ref)?.read_sheets()?,
    };

    debug!(
        path = %path_ref.display(),
        sheets = sheets.len(),
        "loaded workbook"
    );

    Ok(Workbook {
        path: path_ref.to_path_buf(),
        sheets,
    })
}
