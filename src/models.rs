//! Data models for the report engine.
//!
//! This module contains the core data structures shared by the fetcher,
//! the accumulator, the reconciler and the report generator.

use crate::error::OverflowError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque reference to a page of a remote listing.
///
/// The engine never looks inside a cursor; it only hands it back to the
/// page source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Creates a cursor from a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Converts a raw `next` pointer into a cursor. Empty pointers end the stream.
    pub fn from_next(raw: Option<String>) -> Option<Self> {
        raw.filter(|s| !s.trim().is_empty()).map(Self)
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single decoded response unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Records carried by this page.
    pub records: Vec<R>,
    /// Pointer to the next page; `None` ends the stream.
    pub next: Option<Cursor>,
}

impl<R> Page<R> {
    /// Creates the final page of a stream.
    pub fn last(records: Vec<R>) -> Self {
        Self {
            records,
            next: None,
        }
    }
}

/// Numeric fields that can be aggregated per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Strings without any translation.
    Missing,
    /// Suggestions waiting for review.
    Unreviewed,
    /// Strings filled by machine pretranslation.
    Pretranslated,
    /// Approved strings (including strings with warnings).
    Approved,
    /// Strings with quality check warnings.
    Warnings,
    /// Total strings in the resource.
    Total,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Missing => write!(f, "missing"),
            Metric::Unreviewed => write!(f, "unreviewed"),
            Metric::Pretranslated => write!(f, "pretranslated"),
            Metric::Approved => write!(f, "approved"),
            Metric::Warnings => write!(f, "warnings"),
            Metric::Total => write!(f, "total"),
        }
    }
}

/// A flat record keyed by a locale code.
pub trait Record {
    /// The grouping key.
    fn key(&self) -> &str;

    /// Contributing sources named by the record itself.
    ///
    /// Records that name none are attributed to the query they came from.
    fn sources(&self) -> &[String] {
        &[]
    }

    /// Value of a numeric field, `None` if the record does not carry it.
    fn metric(&self, metric: Metric) -> Result<Option<u64>, OverflowError>;
}

/// Locale entry from the locales listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocaleRecord {
    /// Locale code (e.g. `pt-BR`).
    pub code: String,
    /// Projects the locale is enabled for.
    pub projects: Vec<String>,
    /// Strings without any translation.
    pub missing_strings: u64,
    /// Suggestions waiting for review.
    pub unreviewed_strings: u64,
    #[serde(default)]
    pub total_strings: Option<u64>,
    #[serde(default)]
    pub approved_strings: Option<u64>,
    #[serde(default)]
    pub pretranslated_strings: Option<u64>,
    #[serde(default)]
    pub strings_with_warnings: Option<u64>,
}

impl Record for LocaleRecord {
    fn key(&self) -> &str {
        &self.code
    }

    fn sources(&self) -> &[String] {
        &self.projects
    }

    fn metric(&self, metric: Metric) -> Result<Option<u64>, OverflowError> {
        Ok(match metric {
            Metric::Missing => Some(self.missing_strings),
            Metric::Unreviewed => Some(self.unreviewed_strings),
            Metric::Pretranslated => self.pretranslated_strings,
            Metric::Approved => match self.approved_strings {
                Some(approved) => Some(
                    approved
                        .checked_add(self.strings_with_warnings.unwrap_or(0))
                        .ok_or_else(|| OverflowError::new(&self.code, metric))?,
                ),
                None => None,
            },
            Metric::Warnings => self.strings_with_warnings,
            Metric::Total => self.total_strings,
        })
    }
}

/// Per-locale statistics of a single project.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalizationRecord {
    /// Locale code.
    pub locale: String,
    pub missing_strings: u64,
    pub pretranslated_strings: u64,
    pub approved_strings: u64,
    pub strings_with_warnings: u64,
    pub total_strings: u64,
    #[serde(default)]
    pub unreviewed_strings: u64,
}

impl Record for LocalizationRecord {
    fn key(&self) -> &str {
        &self.locale
    }

    fn metric(&self, metric: Metric) -> Result<Option<u64>, OverflowError> {
        Ok(Some(match metric {
            Metric::Missing => self.missing_strings,
            Metric::Unreviewed => self.unreviewed_strings,
            Metric::Pretranslated => self.pretranslated_strings,
            // Strings with warnings are still approved translations.
            Metric::Approved => self
                .approved_strings
                .checked_add(self.strings_with_warnings)
                .ok_or_else(|| OverflowError::new(&self.locale, metric))?,
            Metric::Warnings => self.strings_with_warnings,
            Metric::Total => self.total_strings,
        }))
    }
}

/// Entry of a repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl RepoEntry {
    /// Returns true for visible directories not listed in `ignored`.
    pub fn is_locale_dir(&self, ignored: &[String]) -> bool {
        self.kind == "dir" && !self.name.starts_with('.') && !ignored.contains(&self.name)
    }
}

/// Running totals for one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateRecord {
    /// Distinct sources that contributed to this key.
    pub sources: BTreeSet<String>,
    /// Running totals of the aggregated metrics.
    pub totals: BTreeMap<Metric, u64>,
    /// Derived ratio/percentage values by name.
    pub derived: BTreeMap<String, f64>,
}

impl AggregateRecord {
    /// Creates a record with every listed metric zeroed.
    pub fn new(fields: &[Metric]) -> Self {
        Self {
            sources: BTreeSet::new(),
            totals: fields.iter().map(|m| (*m, 0)).collect(),
            derived: BTreeMap::new(),
        }
    }

    /// Number of distinct contributing sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Running total of a metric (zero when not aggregated).
    pub fn total(&self, metric: Metric) -> u64 {
        self.totals.get(&metric).copied().unwrap_or(0)
    }

    /// A previously computed derived value.
    pub fn derived(&self, name: &str) -> Option<f64> {
        self.derived.get(name).copied()
    }
}
