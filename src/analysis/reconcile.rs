//! Locale key-set reconciliation.
//!
//! Two sources rarely agree on locale naming: one writes `pt_BR`, the other
//! `pt-BR`, and one may only track base languages. Keys are normalized on
//! both sides before the difference is taken, and apparent differences that
//! match a suppression rule are set aside instead of reported.
//!
//! The base-language rule truncates at the first separator (`pt-BR` -> `pt`).
//! It is approximate: a regional variant that is genuinely missing is
//! suppressed whenever its base language exists on the other side.

use crate::error::ReconciliationInputError;
use serde::Serialize;
use std::collections::BTreeSet;

/// Unify separators (`_` becomes `-`) and trim whitespace.
pub fn normalize(key: &str) -> String {
    key.trim().replace('_', "-")
}

/// Base language of a normalized key: everything before the first `-`.
pub fn base_language(key: &str) -> &str {
    key.split('-').next().unwrap_or(key)
}

/// Immutable set of normalized keys from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet(BTreeSet<String>);

impl KeySet {
    /// Normalize raw keys; blank keys are dropped.
    pub fn from_raw<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keys.into_iter()
                .map(|k| normalize(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Suppression rules applied to the raw difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Fallback codes never reported as missing.
    pub catch_all: BTreeSet<String>,
    /// Suppress keys whose base language exists in the reference set.
    pub base_language_fallback: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            catch_all: BTreeSet::new(),
            base_language_fallback: true,
        }
    }
}

impl From<&crate::config::ReconcileConfig> for ReconcilePolicy {
    fn from(config: &crate::config::ReconcileConfig) -> Self {
        Self {
            catch_all: config.catch_all.iter().map(|k| normalize(k)).collect(),
            base_language_fallback: config.base_language_fallback,
        }
    }
}

/// Outcome of comparing a candidate set against a reference set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Keys missing from the reference that should be reported.
    pub reportable: BTreeSet<String>,
    /// Keys missing from the reference but excluded by policy.
    pub ignored: BTreeSet<String>,
    /// Input problems found along the way.
    #[serde(skip)]
    pub warnings: Vec<ReconciliationInputError>,
}

/// Computes `candidates \ reference` under a [`ReconcilePolicy`].
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    /// Keys present in `candidates` but absent from `reference`.
    ///
    /// With an empty reference nothing is suppressed: every candidate is
    /// reported and a warning is attached.
    pub fn reconcile(&self, candidates: &KeySet, reference: &KeySet) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();

        if candidates.is_empty() {
            result
                .warnings
                .push(ReconciliationInputError::EmptyCandidates);
        }

        if reference.is_empty() {
            result
                .warnings
                .push(ReconciliationInputError::EmptyReference);
            result.reportable = candidates.iter().map(str::to_string).collect();
            return result;
        }

        for key in candidates.iter().filter(|k| !reference.contains(k)) {
            if self.is_suppressed(key, reference) {
                result.ignored.insert(key.to_string());
            } else {
                result.reportable.insert(key.to_string());
            }
        }

        result
    }

    fn is_suppressed(&self, key: &str, reference: &KeySet) -> bool {
        if self.policy.catch_all.contains(key) {
            return true;
        }

        self.policy.base_language_fallback && reference.contains(base_language(key))
    }
}
