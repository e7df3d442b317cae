//! Report scenarios.
//!
//! Each scenario fetches one or more sources, folds the records into an
//! [`Accumulator`] (or two key sets for reconciliation) and lays the result
//! out as a [`Table`]. Rendering and writing are left to the caller.

use crate::analysis::reconcile::normalize;
use crate::analysis::{Accumulator, DerivedMetric, KeySet, ReconcilePolicy, Reconciler};
use crate::config::Config;
use crate::error::FetchError;
use crate::fetch::{
    contents_url, locales_url, project_url, ApiSource, HttpClient, HttpSettings, ListingSource,
    PageSource, Paginator,
};
use crate::models::{Cursor, LocaleRecord, LocalizationRecord, Metric, Record, RepoEntry};
use crate::report::{Column, Table};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Parameters of the missing-locales report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRequest {
    /// Pontoon project slug.
    pub project: String,
    pub owner: String,
    pub repo: String,
    /// Folder holding the locale folders; empty for the repository root.
    pub path: String,
    pub include_ignored: bool,
    pub token: Option<String>,
}

/// Column title used for a summed metric.
pub fn metric_title(metric: Metric) -> &'static str {
    match metric {
        Metric::Missing => "Missing Strings",
        Metric::Unreviewed => "Pending Suggestions",
        Metric::Pretranslated => "Pretranslated Strings",
        Metric::Approved => "Approved Strings",
        Metric::Warnings => "Strings With Warnings",
        Metric::Total => "Total Strings",
    }
}

/// Runs report scenarios against one configuration.
pub struct Pipeline {
    config: Config,
    client: HttpClient,
    progress: ProgressBar,
}

impl Pipeline {
    /// Build the HTTP client and progress display for `config`.
    pub fn new(config: Config, show_progress: bool) -> Result<Self> {
        let client = HttpClient::new(HttpSettings::from(&config.api))?;

        let progress = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} records {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };

        Ok(Self {
            config,
            client,
            progress,
        })
    }

    /// Locales with their projects, missing strings and pending suggestions.
    pub async fn locale_stats(&self) -> Result<Table> {
        let mut accumulator = self.accumulator(&self.config.locales.fields);
        let source = ApiSource::<LocaleRecord>::new("locales", self.client.clone());

        self.progress.set_message("locales");
        drain(
            &source,
            locales_url(&self.config.api.base_url),
            &mut accumulator,
            &self.progress,
        )
        .await
        .context("Failed to fetch locale statistics")?;
        self.finish(&accumulator);

        let mut columns = vec![
            ("Locale", Column::Key),
            ("Number of Projects", Column::SourceCount),
            ("Projects", Column::SourceList),
        ];
        columns.extend(
            accumulator
                .fields()
                .iter()
                .map(|m| (metric_title(*m), Column::Total(*m))),
        );

        Ok(Table::from_accumulator("locales", &columns, &accumulator))
    }

    /// Pending suggestions per locale.
    pub async fn pending_suggestions(&self) -> Result<Table> {
        let mut accumulator = self.accumulator(&[Metric::Unreviewed]);
        let source = ApiSource::<LocaleRecord>::new("pending suggestions", self.client.clone());

        self.progress.set_message("pending suggestions");
        drain(
            &source,
            locales_url(&self.config.api.base_url),
            &mut accumulator,
            &self.progress,
        )
        .await
        .context("Failed to fetch pending suggestions")?;
        self.finish(&accumulator);

        Ok(Table::from_accumulator(
            "pending",
            &[
                ("Locale", Column::Key),
                ("Pending Suggestions", Column::Total(Metric::Unreviewed)),
            ],
            &accumulator,
        ))
    }

    /// Completion per locale over every configured project.
    ///
    /// Projects are fetched with bounded parallelism; each folds into its own
    /// partial accumulator and partials are merged in project-list order.
    pub async fn completion(&self) -> Result<Table> {
        let mut accumulator = self.accumulator(&self.config.completion.fields);
        let base_url = self.config.api.base_url.as_str();
        let concurrency = self.config.general.concurrency.max(1);

        info!(
            "Fetching {} projects ({} at a time)",
            self.config.completion.projects.len(),
            concurrency
        );
        self.progress.set_message("projects");

        let partials: Vec<Accumulator> = stream::iter(self.config.completion.projects.iter())
            .map(|project| {
                let mut partial = accumulator.empty_like();
                let client = self.client.clone();
                let progress = self.progress.clone();
                async move {
                    let source = ApiSource::<LocalizationRecord>::new(project.clone(), client);
                    drain(&source, project_url(base_url, project), &mut partial, &progress)
                        .await?;
                    Ok::<_, FetchError>(partial)
                }
            })
            .buffered(concurrency)
            .try_collect()
            .await
            .context("Failed to fetch project statistics")?;

        for partial in partials {
            accumulator
                .absorb(partial)
                .context("Failed to combine project statistics")?;
        }

        let completion = DerivedMetric::completion().with_kind(self.config.completion.kind);
        completion.apply_all(&mut accumulator, self.config.report.precision);
        self.finish(&accumulator);

        Ok(Table::from_accumulator(
            "completion",
            &[
                ("Locale", Column::Key),
                ("Number of Projects", Column::SourceCount),
                ("Completion", Column::Derived(completion.name)),
                ("Approved Strings", Column::Total(Metric::Approved)),
                ("Total Strings", Column::Total(Metric::Total)),
            ],
            &accumulator,
        ))
    }

    /// Locales with a folder in the repository but no localization in the
    /// Pontoon project.
    pub async fn missing_locales(&self, request: &MissingRequest) -> Result<Table> {
        let project = ApiSource::<LocalizationRecord>::new(request.project.clone(), self.client.clone());
        let listing_label = format!("{}/{}", request.owner, request.repo);
        let listing = ListingSource::<RepoEntry>::new(
            listing_label.clone(),
            self.client.clone().with_bearer_token(request.token.clone()),
        );

        self.progress.set_message("project locales");
        let mut tracked = Vec::new();
        let records = Paginator::new(&project, project_url(&self.config.api.base_url, &request.project))
            .into_records();
        let mut records = std::pin::pin!(records);
        while let Some(record) = records
            .try_next()
            .await
            .with_context(|| format!("Failed to fetch locales of {}", request.project))?
        {
            tracked.push(record.key().to_string());
            self.progress.inc(1);
        }

        self.progress.set_message("repository folders");
        let entries = crate::fetch::fetch_all(
            &listing,
            contents_url(
                &self.config.api.github_api_url,
                &request.owner,
                &request.repo,
                &request.path,
            ),
        )
        .await
        .with_context(|| format!("Failed to list {}", listing_label))?;
        self.progress.inc(entries.len() as u64);

        let ignored_folders = &self.config.reconcile.ignored_folders;
        let folders = entries
            .iter()
            .filter(|e| e.is_locale_dir(ignored_folders))
            .map(|e| e.name.as_str());

        let allow = KeySet::from_raw(&self.config.filter.locales);
        let candidates = KeySet::from_raw(
            folders.filter(|name| allow.is_empty() || allow.contains(&normalize(name))),
        );
        let reference = KeySet::from_raw(&tracked);
        debug!(
            "{} repository locales, {} project locales",
            candidates.len(),
            reference.len()
        );

        let reconciler = Reconciler::new(ReconcilePolicy::from(&self.config.reconcile));
        let result = reconciler.reconcile(&candidates, &reference);
        for warning in &result.warnings {
            warn!("{}: {}", request.project, warning);
        }
        self.progress.finish_and_clear();

        info!(
            "Missing locales in {}: {}",
            request.project,
            result
                .reportable
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        if !result.ignored.is_empty() {
            debug!("Suppressed: {:?}", result.ignored);
        }

        Ok(Table::from_reconciliation(
            "missing",
            &result,
            request.include_ignored,
        ))
    }

    fn accumulator(&self, fields: &[Metric]) -> Accumulator {
        Accumulator::new(fields).with_allow_list(self.config.filter.locales.iter().cloned())
    }

    fn finish(&self, accumulator: &Accumulator) {
        self.progress.finish_and_clear();
        if accumulator.is_empty() {
            warn!("No locales to report");
        } else {
            info!("Aggregated {} locales", accumulator.len());
        }
        if accumulator.skipped() > 0 {
            debug!("Skipped {} records outside the locale filter", accumulator.skipped());
        }
    }
}

/// Walk `source` from `start`, folding every record into `accumulator`.
async fn drain<S>(
    source: &S,
    start: Cursor,
    accumulator: &mut Accumulator,
    progress: &ProgressBar,
) -> Result<usize, FetchError>
where
    S: PageSource,
    S::Record: Record,
{
    let mut paginator = Paginator::new(source, start);
    let mut count = 0;

    while let Some(page) = paginator.next_page().await? {
        for record in &page.records {
            accumulator
                .ingest(source.label(), record)
                .map_err(|e| FetchError::Decode {
                    source_id: source.label().to_string(),
                    page: paginator.pages_read(),
                    message: e.to_string(),
                })?;
        }
        count += page.records.len();
        progress.inc(page.records.len() as u64);
    }

    debug!(
        "{}: {} records in {} pages",
        source.label(),
        count,
        paginator.pages_read()
    );
    Ok(count)
}
