//! Derived ratio and percentage metrics.
//!
//! A zero denominator yields 0.0. Values are rounded half away from zero to
//! a fixed number of decimal places so repeated runs print the same digits.

use crate::analysis::Accumulator;
use crate::models::{AggregateRecord, Metric};
use serde::{Deserialize, Serialize};

/// Default number of decimal places for derived values.
pub const DEFAULT_PRECISION: u32 = 2;

/// How the quotient is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// numerator / denominator × 100
    #[default]
    Percentage,
    /// numerator / denominator
    Ratio,
}

/// A value computed from two running totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedMetric {
    pub name: &'static str,
    pub numerator: Metric,
    pub denominator: Metric,
    pub kind: MetricKind,
}

impl DerivedMetric {
    /// Share of approved strings, as a percentage of all strings.
    pub fn completion() -> Self {
        Self {
            name: "completion",
            numerator: Metric::Approved,
            denominator: Metric::Total,
            kind: MetricKind::Percentage,
        }
    }

    /// Same metric expressed as `kind`.
    pub fn with_kind(self, kind: MetricKind) -> Self {
        Self { kind, ..self }
    }

    /// Compute the value for `record` without storing it.
    pub fn compute(&self, record: &AggregateRecord, precision: u32) -> f64 {
        let ratio = safe_ratio(record.total(self.numerator), record.total(self.denominator));
        let value = match self.kind {
            MetricKind::Percentage => ratio * 100.0,
            MetricKind::Ratio => ratio,
        };
        round_to(value, precision)
    }

    /// Compute the value and store it on `record` under this metric's name.
    pub fn apply(&self, record: &mut AggregateRecord, precision: u32) -> f64 {
        let value = self.compute(record, precision);
        record.derived.insert(self.name.to_string(), value);
        value
    }

    /// Apply to every aggregate of a run.
    pub fn apply_all(&self, accumulator: &mut Accumulator, precision: u32) {
        for record in accumulator.records_mut() {
            self.apply(record, precision);
        }
    }
}

/// `numerator / denominator`, or 0.0 when the denominator is zero.
pub fn safe_ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Round half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(approved: u64, total: u64) -> AggregateRecord {
        let mut record = AggregateRecord::new(&[Metric::Approved, Metric::Total]);
        record.totals.insert(Metric::Approved, approved);
        record.totals.insert(Metric::Total, total);
        record
    }

    #[test]
    fn test_completion_percentage() {
        let mut rec = record(10, 15);
        let value = DerivedMetric::completion().apply(&mut rec, DEFAULT_PRECISION);

        assert_eq!(value, 66.67);
        assert_eq!(rec.derived("completion"), Some(66.67));
    }

    #[test]
    fn test_zero_denominator_is_zero() {
        let mut rec = record(0, 0);
        let value = DerivedMetric::completion().apply(&mut rec, DEFAULT_PRECISION);

        assert_eq!(value, 0.0);
        assert!(value.is_finite());
        assert_eq!(safe_ratio(5, 0), 0.0);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut rec = record(1, 3);
        let metric = DerivedMetric::completion();

        let first = metric.apply(&mut rec, DEFAULT_PRECISION);
        let second = metric.apply(&mut rec, DEFAULT_PRECISION);

        assert_eq!(first, second);
        assert_eq!(first, 33.33);
        assert_eq!(rec.derived.len(), 1);
    }

    #[test]
    fn test_ratio_kind() {
        let metric = DerivedMetric {
            name: "approved_ratio",
            numerator: Metric::Approved,
            denominator: Metric::Total,
            kind: MetricKind::Ratio,
        };

        assert_eq!(metric.compute(&record(2, 3), 2), 0.67);
        assert_eq!(metric.compute(&record(3, 3), 2), 1.0);
    }

    #[test]
    fn test_completion_as_ratio() {
        let metric = DerivedMetric::completion().with_kind(MetricKind::Ratio);
        assert_eq!(metric.name, "completion");
        assert_eq!(metric.compute(&record(10, 15), 2), 0.67);
        assert_eq!(MetricKind::default(), MetricKind::Percentage);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(12.5, 0), 13.0);
        assert_eq!(round_to(1.23456, 3), 1.235);
    }

    #[test]
    fn test_apply_all() {
        use crate::models::LocalizationRecord;

        let localization = |locale: &str, approved, total| LocalizationRecord {
            locale: locale.to_string(),
            missing_strings: 0,
            pretranslated_strings: 0,
            approved_strings: approved,
            strings_with_warnings: 0,
            total_strings: total,
            unreviewed_strings: 0,
        };

        let mut acc = Accumulator::new(&[Metric::Approved, Metric::Total]);
        acc.ingest("firefox", &localization("de", 1, 2)).unwrap();
        acc.ingest("firefox", &localization("ja", 0, 0)).unwrap();

        DerivedMetric::completion().apply_all(&mut acc, 2);

        assert_eq!(acc.get("de").unwrap().derived("completion"), Some(50.0));
        assert_eq!(acc.get("ja").unwrap().derived("completion"), Some(0.0));
    }
}
