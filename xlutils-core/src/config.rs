//! Configuration for the comparison tool

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_SHEET_NAME;

/// File looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "diffxl.toml";

/// Main comparison configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which files in a target directory count as workbooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Extensions matched case-insensitively, without the leading dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Where and how difference artifacts are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            sheet_name: default_sheet_name(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx".to_string(), "xlsm".to_string()]
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

impl DiffConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DiffConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else `diffxl.toml` from the working directory if present,
    /// else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_file(&default_path)
                .with_context(|| format!("Failed to load config from {}", default_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.input.extensions.is_empty() {
            anyhow::bail!("Configuration error: input.extensions must not be empty");
        }
        let name = &self.output.sheet_name;
        if name.is_empty() || name.chars().count() > 31 {
            anyhow::bail!(
                "Configuration error: output.sheet_name must be 1 to 31 characters, got '{}'",
                name
            );
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, '\\' | '/' | '?' | '*' | '[' | ']' | ':'))
        {
            anyhow::bail!(
                "Configuration error: output.sheet_name contains invalid character '{}'",
                c
            );
        }
        Ok(())
    }
}
