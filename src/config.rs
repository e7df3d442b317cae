//! Configuration file handling.
//!
//! This module handles loading, merging and validating configuration from
//! `.l10n-report.toml` files.

use crate::analysis::MetricKind;
use crate::cli::OutputFormat;
use crate::models::Metric;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".l10n-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Key restrictions.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Reconciliation settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Report rendering settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Locale statistics report.
    #[serde(default)]
    pub locales: LocalesConfig,

    /// Completion report.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path (`-` for stdout).
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of sources fetched in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "output.csv".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Stats API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Repository hosting API base URL.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries after a transient failure.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Initial retry delay in milliseconds.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            github_api_url: default_github_api_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_base_url() -> String {
    "https://pontoon.mozilla.org".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    500
}

/// Key restrictions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Only report these locales. Empty means every locale observed.
    #[serde(default)]
    pub locales: Vec<String>,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Fallback locale codes never reported as missing.
    #[serde(default = "default_catch_all")]
    pub catch_all: Vec<String>,

    /// Suppress regional variants whose base language is already tracked.
    #[serde(default = "default_true")]
    pub base_language_fallback: bool,

    /// Repository folders that are not locales.
    #[serde(default = "default_ignored_folders")]
    pub ignored_folders: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            catch_all: default_catch_all(),
            base_language_fallback: true,
            ignored_folders: default_ignored_folders(),
        }
    }
}

fn default_catch_all() -> Vec<String> {
    vec!["en-US".to_string()]
}

fn default_ignored_folders() -> Vec<String> {
    vec!["templates".to_string(), "configs".to_string()]
}

fn default_true() -> bool {
    true
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Column delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Separator between elements of list columns.
    #[serde(default = "default_list_separator")]
    pub list_separator: char,

    /// Decimal places for derived values.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            list_separator: default_list_separator(),
            precision: default_precision(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_list_separator() -> char {
    ' '
}

fn default_precision() -> u32 {
    crate::analysis::metrics::DEFAULT_PRECISION
}

/// Locale statistics report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalesConfig {
    /// Metrics summed per locale.
    #[serde(default = "default_locales_fields")]
    pub fields: Vec<Metric>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            fields: default_locales_fields(),
        }
    }
}

fn default_locales_fields() -> Vec<Metric> {
    vec![Metric::Missing, Metric::Unreviewed]
}

/// Completion report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Projects whose statistics are combined.
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,

    /// Metrics summed per locale.
    #[serde(default = "default_completion_fields")]
    pub fields: Vec<Metric>,

    /// Completion as a percentage (default) or a 0-1 ratio.
    #[serde(default)]
    pub kind: MetricKind,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            fields: default_completion_fields(),
            kind: MetricKind::default(),
        }
    }
}

fn default_projects() -> Vec<String> {
    vec![
        "firefox-for-android",
        "firefox-for-ios",
        "firefox-monitor-website",
        "firefox-relay-website",
        "firefox",
        "mozilla-accounts",
        "mozilla-vpn-client",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_completion_fields() -> Vec<Metric> {
    vec![
        Metric::Missing,
        Metric::Approved,
        Metric::Pretranslated,
        Metric::Total,
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref base_url) = args.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.api.retries = retries;
        }
        if let Some(ref locales) = args.locales {
            self.filter.locales = locales.clone();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.api.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }
        for url in [&self.api.base_url, &self.api.github_api_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("API URL must start with 'http://' or 'https://': {}", url);
            }
        }

        let report = &self.report;
        if report.delimiter == report.list_separator {
            bail!("Delimiter and list separator must differ");
        }
        for (name, c) in [
            ("delimiter", report.delimiter),
            ("list separator", report.list_separator),
        ] {
            if matches!(c, '"' | '\n' | '\r') {
                bail!("Invalid {}: {:?}", name, c);
            }
        }
        if report.precision > 6 {
            bail!("Precision must be between 0 and 6");
        }

        for metric in [Metric::Approved, Metric::Total] {
            if !self.completion.fields.contains(&metric) {
                bail!("Completion fields must include '{}'", metric);
            }
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://pontoon.mozilla.org");
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.report.precision, 2);
        assert_eq!(config.completion.projects.len(), 7);
        assert!(config.filter.locales.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "completion.csv"
format = "markdown"

[api]
base_url = "https://pontoon.example.org"
retries = 0

[filter]
locales = ["de", "fr"]

[reconcile]
catch_all = ["en-US", "en"]
base_language_fallback = false

[report]
delimiter = ";"
precision = 1

[completion]
projects = ["firefox"]
fields = ["approved", "total"]
kind = "ratio"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "completion.csv");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.api.base_url, "https://pontoon.example.org");
        assert_eq!(config.api.retries, 0);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.filter.locales, vec!["de", "fr"]);
        assert_eq!(config.reconcile.catch_all, vec!["en-US", "en"]);
        assert!(!config.reconcile.base_language_fallback);
        assert_eq!(config.reconcile.ignored_folders, vec!["templates", "configs"]);
        assert_eq!(config.report.delimiter, ';');
        assert_eq!(config.report.list_separator, ' ');
        assert_eq!(config.completion.fields, vec![Metric::Approved, Metric::Total]);
        assert_eq!(config.completion.kind, MetricKind::Ratio);
        assert_eq!(Config::default().completion.kind, MetricKind::Percentage);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result = toml::from_str::<Config>("[locales]\nfields = [\"words\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.report.list_separator = ',';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.delimiter = '"';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.completion.fields = vec![Metric::Missing];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = "pontoon.mozilla.org".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nconcurrency = 2").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.general.output, "output.csv");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[reconcile]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.completion.projects, Config::default().completion.projects);
    }
}
