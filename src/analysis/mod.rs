//! Analysis modules.
//!
//! Aggregation of fetched records, key-set reconciliation and derived
//! metrics. Nothing here performs I/O.

pub mod accumulator;
pub mod metrics;
pub mod reconcile;

pub use accumulator::Accumulator;
pub use metrics::{DerivedMetric, MetricKind};
pub use reconcile::{KeySet, ReconcilePolicy, Reconciler, ReconciliationResult};
