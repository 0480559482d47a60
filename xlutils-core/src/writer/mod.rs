//! Workbook output

pub mod xlsx_writer;

pub use xlsx_writer::{SheetData, write_package, write_xlsx};
