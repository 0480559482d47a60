//! Output formatters for comparison results

use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::path::Path;
use xlutils_core::{DifferenceRecord, TargetOutcome};

pub fn print_opening(base: &Path) {
    println!("Opening '{}'...", file_label(base).bold());
}

pub fn print_comparing(base: &Path, target: &Path) {
    println!(
        "Comparing '{}' with '{}'...",
        file_label(base).bold(),
        file_label(target).cyan().bold()
    );
}

pub fn print_no_targets(target: &Path) {
    println!(
        "{}",
        format!("No workbooks found in '{}'", target.display()).yellow()
    );
}

/// Print the result of one target comparison
pub fn print_outcome(outcome: &TargetOutcome) {
    match &outcome.artifact {
        Some(path) => println!(
            "  {} {} ({})",
            "Differences saved to".yellow().bold(),
            path.display(),
            count_label(outcome.report.len())
        ),
        None => println!("  {}", "No differences found.".green()),
    }
}

/// Print totals over all targets
pub fn print_summary(outcomes: &[TargetOutcome]) {
    let differing = outcomes.iter().filter(|o| !o.report.is_empty()).count();
    let total: usize = outcomes.iter().map(|o| o.report.len()).sum();

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Targets compared:".bold(), outcomes.len());
    if differing > 0 {
        println!("  {} {}", "Targets with differences:".yellow().bold(), differing);
        println!("  {} {}", "Differing cells:".yellow().bold(), total);
    }
    println!("{}", "Done.".green().bold());
}

#[derive(Serialize)]
struct JsonTarget<'a> {
    file: String,
    artifact: Option<String>,
    differences: &'a [DifferenceRecord],
}

/// Print results in JSON format
pub fn print_json(base: &Path, outcomes: &[TargetOutcome]) -> Result<()> {
    println!("{}", to_json(base, outcomes)?);
    Ok(())
}

fn to_json(base: &Path, outcomes: &[TargetOutcome]) -> Result<String> {
    let targets: Vec<_> = outcomes
        .iter()
        .map(|o| JsonTarget {
            file: o.target.display().to_string(),
            artifact: o.artifact.as_ref().map(|p| p.display().to_string()),
            differences: &o.report.records,
        })
        .collect();

    let output = serde_json::json!({
        "base": base.display().to_string(),
        "targets": targets,
        "summary": {
            "targets": outcomes.len(),
            "with_differences": outcomes.iter().filter(|o| !o.report.is_empty()).count(),
            "differences": outcomes.iter().map(|o| o.report.len()).sum::<usize>(),
        }
    });

    Ok(serde_json::to_string_pretty(&output)?)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 cell".to_string()
    } else {
        format!("{} cells", count)
    }
}
