//! Difference records and per-target reports

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::writer::{SheetData, write_xlsx};

/// Default title of the sheet holding the differences
pub const DEFAULT_SHEET_NAME: &str = "Differences";

/// One cell whose normalized values disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferenceRecord {
    pub sheet: String,
    pub cell: String,
    pub value1: String,
    pub value2: String,
}

/// All differences found between a base workbook and one target
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    /// Stem of the base workbook file
    pub base: String,
    /// Stem of the target workbook file
    pub target: String,
    pub records: Vec<DifferenceRecord>,
}

impl ComparisonReport {
    pub fn new(base: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            target: target.into(),
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Column titles of the output table
    pub fn header(&self) -> [String; 4] {
        [
            "Sheet".to_string(),
            "Cell".to_string(),
            format!("{} Value", self.base),
            format!("{} Value", self.target),
        ]
    }

    /// File name of the output artifact, e.g. `diff_jan_feb.xlsx`
    pub fn artifact_name(&self) -> String {
        format!("diff_{}_{}.xlsx", self.base, self.target)
    }

    /// Header row followed by one row per record, in produced order
    pub fn to_sheet(&self, sheet_name: &str) -> SheetData {
        let mut sheet = SheetData::new(sheet_name);
        sheet.push_text_row(self.header());
        for record in &self.records {
            sheet.push_text_row([
                record.sheet.as_str(),
                record.cell.as_str(),
                record.value1.as_str(),
                record.value2.as_str(),
            ]);
        }
        sheet
    }

    /// Write the artifact into `dir`. Nothing is written for an empty report.
    pub fn write_artifact(&self, dir: &Path, sheet_name: &str) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }
        let path = dir.join(self.artifact_name());
        write_xlsx(&path, &[self.to_sheet(sheet_name)])?;
        info!(path = %path.display(), records = self.len(), "wrote differences");
        Ok(Some(path))
    }
}
