//! Concatenation of the first sheet of every workbook in a directory

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::driver::resolve_targets;
use crate::reader::calamine_reader::read_first_sheet;
use crate::writer::SheetData;

/// Longest sheet title a workbook accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Copy the first sheet of every workbook in `dir`, one output sheet per file.
///
/// Files are taken in sorted name order. Each sheet is titled by its file stem
/// and keeps the cell positions and formulas of its source.
pub fn concat_directory(dir: &Path, extensions: &[String]) -> Result<Vec<SheetData>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut used_names = HashSet::new();
    let mut sheets = Vec::new();

    for path in resolve_targets(dir, extensions)? {
        info!(path = %path.display(), "copying first sheet");
        let Some(source) = read_first_sheet(&path)? else {
            warn!(path = %path.display(), "workbook has no sheets");
            continue;
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut sheet = SheetData::new(unique_sheet_name(&stem, &mut used_names));
        sheet.cells.extend(
            source
                .sheet
                .cells
                .into_iter()
                .map(|(address, cell)| (address, cell.value)),
        );
        sheet.formulas = source.formulas;
        sheets.push(sheet);
    }

    Ok(sheets)
}

/// Default output file name: the directory's own name with an `.xlsx` extension
pub fn output_name(dir: &Path) -> Result<String> {
    let resolved = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;
    let name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    Ok(format!("{}.xlsx", name))
}

/// Truncate to the sheet-name limit and add a numeric suffix on collision.
/// Names are compared case-insensitively, as spreadsheet applications do.
fn unique_sheet_name(stem: &str, used: &mut HashSet<String>) -> String {
    let base: String = if stem.is_empty() {
        "Sheet".to_string()
    } else {
        stem.chars()
            .map(|c| match c {
                '\\' | '/' | '?' | '*' | '[' | ']' | ':' => '_',
                _ => c,
            })
            .take(MAX_SHEET_NAME_LEN)
            .collect()
    };

    let mut candidate = base.clone();
    let mut counter = 1;
    while used.contains(&candidate.to_lowercase()) {
        counter += 1;
        let suffix = format!(" ({})", counter);
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
    }
    used.insert(candidate.to_lowercase());
    candidate
}
