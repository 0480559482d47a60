//! xlutils-core: workbook comparison and concatenation
//!
//! Loads workbooks, compares them cell by cell on normalized values and writes
//! the differences as a new workbook.

pub mod concat;
pub mod config;
pub mod diff;
pub mod driver;
pub mod reader;
pub mod report;
pub mod writer;

pub use config::DiffConfig;
pub use driver::{Comparison, RunEvent, TargetOutcome, resolve_targets};
pub use reader::{Workbook, read_workbook};
pub use report::{ComparisonReport, DifferenceRecord};
