use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xlutils_core::DiffConfig;
use xlutils_core::concat::{concat_directory, output_name};
use xlutils_core::writer::write_xlsx;

#[derive(Parser)]
#[command(name = "catxl")]
#[command(about = "Merge the first sheet of every Excel workbook in a directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the workbooks to merge
    #[arg(value_name = "DIR")]
    directory: PathBuf,

    /// Output file (defaults to <DIR name>.xlsx in the current directory)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log progress details to stderr
    #[arg(short, long)]
    verbose: bool,
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

    let output = match cli.output {
        Some(path) => path,
        None => PathBuf::from(output_name(&cli.directory)?),
    };

    println!("Reading '{}'...", cli.directory.display().to_string().bold());
    let extensions = DiffConfig::default().input.extensions;
    let sheets = concat_directory(&cli.directory, &extensions)?;

    if sheets.is_empty() {
        println!("{}", "No workbooks found.".yellow());
        return Ok(());
    }

    for sheet in &sheets {
        println!("  {} {}", "Sheet:".bold(), sheet.name.cyan());
    }

    println!("Writing...");
    write_xlsx(&output, &sheets)?;
    println!(
        "{} {}",
        "Workbook saved to".green().bold(),
        output.display()
    );

    Ok(())
}
