use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xlutils_core::{Comparison, DiffConfig, RunEvent, resolve_targets};

mod formatter;

#[derive(Parser)]
#[command(name = "diffxl")]
#[command(about = "Extract cell differences between Excel workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Base workbook every target is compared against
    #[arg(value_name = "BASE")]
    base: PathBuf,

    /// Target workbook, or a directory of workbooks
    #[arg(value_name = "TARGET")]
    target: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving the diff_<base>_<target>.xlsx files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Log progress details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose || std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let mut config = DiffConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    config.validate().context("Invalid configuration")?;

    let human = matches!(cli.format, OutputFormat::Human);

    if human {
        formatter::print_opening(&cli.base);
    }
    let comparison = Comparison::new(&cli.base, &config)?;

    let targets = resolve_targets(&cli.target, &config.input.extensions)?;
    if targets.is_empty() && human {
        formatter::print_no_targets(&cli.target);
    }

    let outcomes = comparison.run(&targets, |event| {
        if !human {
            return;
        }
        match event {
            RunEvent::Comparing(target) => formatter::print_comparing(&cli.base, target),
            RunEvent::Finished(outcome) => formatter::print_outcome(outcome),
        }
    })?;

    match cli.format {
        OutputFormat::Human => formatter::print_summary(&outcomes),
        OutputFormat::Json => formatter::print_json(&cli.base, &outcomes)?,
    }

    Ok(())
}
