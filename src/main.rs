//! l10n-report - localization statistics reports from Pontoon
//!
//! Walks the paginated Pontoon stats API, combines records per locale
//! across pages and projects, reconciles locale lists against a GitHub
//! repository and writes deterministic CSV, Markdown or JSON reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (arguments, config, transport, decode, output)

mod analysis;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use cli::{Args, Command};
use config::{Config, CONFIG_FILE};
use pipeline::{MissingRequest, Pipeline};
use report::RenderOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `general.verbose` applies
    let (mut config, config_path) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("l10n-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    if let Err(e) = run_report(args, config).await {
        error!("Report failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        if let Some(fetch) = e.downcast_ref::<error::FetchError>() {
            if fetch.is_transport() {
                eprintln!("Check the API URL and network access (--base-url, --timeout, --retries).");
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .l10n-report.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    println!("Edit it to customize projects, locales, delimiters and more.");
    Ok(())
}

/// Initialize logging at the given level.
///
/// Logs go to stderr so a report written to stdout stays clean.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the requested report and write it out.
async fn run_report(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    config.validate().context("Invalid configuration")?;

    let Some(command) = args.command.clone() else {
        anyhow::bail!("A report subcommand is required");
    };

    let options = RenderOptions::from(&config.report);
    let format = config.general.format;
    let output = config.general.output.clone();

    let pipeline = Pipeline::new(config, !args.quiet)?;
    let table = match command {
        Command::Locales => pipeline.locale_stats().await?,
        Command::Pending => pipeline.pending_suggestions().await?,
        Command::Completion => pipeline.completion().await?,
        Command::Missing {
            project,
            repo,
            owner,
            path,
            include_ignored,
            token,
        } => {
            let request = MissingRequest {
                project,
                owner,
                repo,
                path: path.unwrap_or_default(),
                include_ignored,
                token,
            };
            pipeline.missing_locales(&request).await?
        }
    };

    let document = report::render(&table, format, &options)?;
    write_output(&output, &document)?;

    info!(
        "{} rows written to {} in {:.1}s",
        table.rows.len(),
        if output == "-" { "stdout" } else { output.as_str() },
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Write the rendered document to a file, or to stdout for `-`.
fn write_output(output: &str, document: &str) -> Result<()> {
    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(document.as_bytes())
            .context("Failed to write report to stdout")?;
        return stdout.flush().context("Failed to write report to stdout");
    }

    std::fs::write(output, document)
        .with_context(|| format!("Failed to write report to {}", output))
}

/// Load configuration from file or use defaults.
///
/// Returns the path the configuration came from, if any. Runs before
/// logging is set up, so the caller reports it.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => Err(e.context(format!("Failed to load {}", CONFIG_FILE))),
    }
}
