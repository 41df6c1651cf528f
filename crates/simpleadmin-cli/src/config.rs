//! Configuration file handling for simpleadmin-cli

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use simpleadmin_client::ExecOptions;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

pub const DEFAULT_SERVER: &str = "http://192.168.225.1";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default router URL
    pub server: Option<String>,
    /// Executor path on the router
    pub endpoint: Option<String>,
    /// Retries after the first attempt
    pub retries: Option<i64>,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: Option<f64>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server: Option<String>,
    pub endpoint: Option<String>,
    pub retries: Option<i64>,
    pub timeout_ms: Option<f64>,
    pub output: Option<OutputFormat>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("simpleadmin-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: CliOverrides) -> MergedConfig {
        let file_exec = ExecOptions {
            retries: self.retries,
            timeout_ms: self.timeout_ms,
            endpoint: self.endpoint.clone(),
        };
        let exec = ExecOptions {
            retries: args.retries,
            timeout_ms: args.timeout_ms,
            endpoint: args.endpoint,
        }
        .or(&file_exec);

        let output = args
            .output
            .or_else(|| {
                self.output
                    .as_deref()
                    .and_then(|s| OutputFormat::from_str(s, true).ok())
            })
            .unwrap_or_default();

        MergedConfig {
            server: args
                .server
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            exec,
            output,
            no_color: args.no_color || self.no_color.unwrap_or(false),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    /// Per-call defaults handed to the client
    pub exec: ExecOptions,
    pub output: OutputFormat,
    pub no_color: bool,
}
