//! Per-key aggregation across pages and source queries.
//!
//! Records arriving for the same key are merged into a single
//! [`AggregateRecord`]: numeric fields are summed, contributing sources are
//! collected into a set. Only the configured metrics are summed. Sums are
//! checked: a total that would overflow is an error, never a wrapped value.

use crate::error::OverflowError;
use crate::models::{AggregateRecord, Metric, Record};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Mapping from key to running totals for one report run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    fields: Vec<Metric>,
    allow: Option<BTreeSet<String>>,
    entries: BTreeMap<String, AggregateRecord>,
    skipped: usize,
}

impl Accumulator {
    /// Create an accumulator summing the given metrics.
    pub fn new(fields: &[Metric]) -> Self {
        let mut unique = Vec::with_capacity(fields.len());
        for field in fields {
            if !unique.contains(field) {
                unique.push(*field);
            }
        }

        Self {
            fields: unique,
            ..Self::default()
        }
    }

    /// Restrict processing to the listed keys. An empty list keeps every key.
    pub fn with_allow_list<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        self.allow = if keys.is_empty() { None } else { Some(keys) };
        self
    }

    /// Merge one record. Returns `Ok(false)` when the key is filtered out.
    ///
    /// On overflow nothing of the record is applied.
    pub fn ingest<R: Record>(&mut self, source_id: &str, record: &R) -> Result<bool, OverflowError> {
        let key = record.key();

        if let Some(ref allow) = self.allow {
            if !allow.contains(key) {
                self.skipped += 1;
                return Ok(false);
            }
        }

        let current = self.entries.get(key);
        let mut sums = Vec::with_capacity(self.fields.len());
        for metric in &self.fields {
            if let Some(value) = record.metric(*metric)? {
                let total = current.map_or(0, |entry| entry.total(*metric));
                let sum = total
                    .checked_add(value)
                    .ok_or_else(|| OverflowError::new(key, *metric))?;
                sums.push((*metric, sum));
            }
        }

        let fields = &self.fields;
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| AggregateRecord::new(fields));

        let named = record.sources();
        if named.is_empty() {
            entry.sources.insert(source_id.to_string());
        } else {
            entry.sources.extend(named.iter().cloned());
        }
        entry.totals.extend(sums);

        Ok(true)
    }

    /// Merge a partial accumulator built from other sources.
    pub fn absorb(&mut self, other: Accumulator) -> Result<(), OverflowError> {
        self.skipped += other.skipped;

        for (key, incoming) in other.entries {
            let current = self.entries.get(&key);
            let mut sums = Vec::with_capacity(incoming.totals.len());
            for (metric, value) in incoming.totals {
                if self.fields.contains(&metric) {
                    let total = current.map_or(0, |entry| entry.total(metric));
                    let sum = total
                        .checked_add(value)
                        .ok_or_else(|| OverflowError::new(&key, metric))?;
                    sums.push((metric, sum));
                }
            }

            let fields = &self.fields;
            let entry = self
                .entries
                .entry(key)
                .or_insert_with(|| AggregateRecord::new(fields));
            entry.sources.extend(incoming.sources);
            entry.totals.extend(sums);
        }

        debug!("Accumulator holds {} keys after merge", self.entries.len());
        Ok(())
    }

    /// A fresh, empty accumulator with the same configuration.
    pub fn empty_like(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            allow: self.allow.clone(),
            entries: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Aggregated metrics.
    pub fn fields(&self) -> &[Metric] {
        &self.fields
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&AggregateRecord> {
        self.entries.get(key)
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records dropped by the allow-list.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AggregateRecord)> {
        self.entries.iter()
    }

    /// Mutable access to every aggregate, in key order.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut AggregateRecord> {
        self.entries.values_mut()
    }
}
