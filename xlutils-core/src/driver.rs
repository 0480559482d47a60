//! Runs a base workbook against one or more targets

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::DiffConfig;
use crate::diff::diff_workbooks;
use crate::reader::{Workbook, read_workbook};
use crate::report::ComparisonReport;

/// Expand a target path into the ordered list of workbooks to compare.
///
/// A file yields itself. A directory yields its regular files (not recursing)
/// whose extension is one of `extensions`, sorted by file name. Office lock
/// files (`~$name.xlsx`) are skipped.
pub fn resolve_targets(path: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?;

    let mut targets = Vec::new();
    for entry in entries {
        let entry = entry?;
        let candidate = entry.path();
        if !candidate.is_file() || !has_extension(&candidate, extensions) {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with("~$") {
            debug!(path = %candidate.display(), "skipping lock file");
            continue;
        }
        targets.push(candidate);
    }
    targets.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(targets)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Outcome of comparing the base against one target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: PathBuf,
    pub report: ComparisonReport,
    /// Written artifact, if the report had any differences
    pub artifact: Option<PathBuf>,
}

/// Progress of [`Comparison::run`]
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// A target is about to be loaded
    Comparing(&'a Path),
    /// A target was compared and its artifact, if any, written
    Finished(&'a TargetOutcome),
}

/// A loaded base workbook ready to be compared against targets
pub struct Comparison {
    base: Workbook,
    config: DiffConfig,
}

impl Comparison {
    /// Load the base workbook
    pub fn new<P: AsRef<Path>>(base_path: P, config: &DiffConfig) -> Result<Self> {
        let base_path = base_path.as_ref();
        info!(path = %base_path.display(), "opening base workbook");
        let base = read_workbook(base_path)
            .with_context(|| format!("Failed to load workbook: {}", base_path.display()))?;
        Ok(Self::from_workbook(base, config))
    }

    /// Use an already loaded base workbook
    pub fn from_workbook(base: Workbook, config: &DiffConfig) -> Self {
        Self {
            base,
            config: config.clone(),
        }
    }

    /// Compare the base against the workbook at `target_path`
    pub fn compare<P: AsRef<Path>>(&self, target_path: P) -> Result<ComparisonReport> {
        let target_path = target_path.as_ref();
        info!(path = %target_path.display(), "opening target workbook");
        let target = read_workbook(target_path)
            .with_context(|| format!("Failed to load workbook: {}", target_path.display()))?;
        Ok(self.compare_workbook(&target))
    }

    /// Compare the base against an already loaded target
    pub fn compare_workbook(&self, target: &Workbook) -> ComparisonReport {
        let mut report = ComparisonReport::new(self.base.stem(), target.stem());
        report.records = diff_workbooks(&self.base, target);
        info!(
            base = %report.base,
            target = %report.target,
            differences = report.len(),
            "compared workbooks"
        );
        report
    }

    /// Create the output directory if it does not exist yet
    fn ensure_output_dir(&self) -> Result<()> {
        let directory = &self.config.output.directory;
        if !directory.exists() {
            fs::create_dir_all(directory).with_context(|| {
                format!("Failed to create output directory: {}", directory.display())
            })?;
        }
        Ok(())
    }

    /// Compare one target and write its artifact if it has differences
    fn process(&self, target: &Path) -> Result<TargetOutcome> {
        let report = self.compare(target)?;
        let output = &self.config.output;
        let artifact = report.write_artifact(&output.directory, &output.sheet_name)?;
        Ok(TargetOutcome {
            target: target.to_path_buf(),
            report,
            artifact,
        })
    }

    /// Process every target in order, reporting progress to `on_event`.
    /// The first load or write failure aborts the run.
    pub fn run<F>(&self, targets: &[PathBuf], mut on_event: F) -> Result<Vec<TargetOutcome>>
    where
        F: FnMut(RunEvent<'_>),
    {
        self.ensure_output_dir()?;
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            on_event(RunEvent::Comparing(target));
            let outcome = self.process(target)?;
            on_event(RunEvent::Finished(&outcome));
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
