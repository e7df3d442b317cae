//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// l10n-report - localization statistics reports from Pontoon
///
/// Fetch paginated statistics from the Pontoon API, combine them per
/// locale and write CSV, Markdown or JSON reports.
///
/// Examples:
///   l10n-report locales
///   l10n-report --output pending.csv pending
///   l10n-report --format markdown completion
///   l10n-report missing --project firefox-for-ios --repo firefox-ios-l10n
///   l10n-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(subcommand_required = false, arg_required_else_help = true)]
pub struct Args {
    /// Report to build
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .l10n-report.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output file path for the report (`-` for stdout)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<String>,

    /// Output format (csv, markdown, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Pontoon base URL
    #[arg(long, value_name = "URL", env = "PONTOON_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Retries after a transient failure (429, 5xx, timeout)
    #[arg(long, value_name = "COUNT", global = true)]
    pub retries: Option<u32>,

    /// Number of sources fetched in parallel
    #[arg(long, value_name = "NUM", global = true)]
    pub concurrency: Option<usize>,

    /// Only report these locales (comma-separated)
    ///
    /// Example: --locales de,fr,pt-BR
    #[arg(long, value_name = "CODES", value_delimiter = ',', global = true)]
    pub locales: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .l10n-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Available reports.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Missing strings and pending suggestions per locale
    Locales,

    /// Pending suggestions per locale
    Pending,

    /// Completion per locale across the configured projects
    Completion,

    /// Locales with a folder in the repository but missing from the Pontoon project
    Missing {
        /// Pontoon project slug
        #[arg(long, value_name = "SLUG")]
        project: String,

        /// Repository holding one folder per locale
        #[arg(long, value_name = "NAME")]
        repo: String,

        /// Repository owner
        #[arg(long, value_name = "OWNER", default_value = "mozilla-l10n")]
        owner: String,

        /// Folder inside the repository holding the locales
        #[arg(long, value_name = "PATH")]
        path: Option<String>,

        /// Also list suppressed locales with their status
        #[arg(long)]
        include_ignored: bool,

        /// GitHub token for authenticated requests
        #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited text (default)
    #[default]
    Csv,
    /// Markdown table
    Markdown,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A report subcommand is required".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(Command::Missing { project, repo, .. }) = &self.command {
            if project.trim().is_empty() || repo.trim().is_empty() {
                return Err("--project and --repo must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` is the configured `general.verbose`; `--quiet` wins
    /// over both.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
