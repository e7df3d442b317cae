//! Error types for fetching and reconciliation.

use crate::models::Metric;
use thiserror::Error;

/// A failure while walking a remote listing.
///
/// Every variant aborts the run: a report built from a partial walk would
/// carry silently incomplete totals.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection or protocol failure.
    #[error("transport error reading {source_id} (page {page}): {message}")]
    Transport {
        source_id: String,
        page: usize,
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("{source_id} returned HTTP {status} (page {page}): {body}")]
    Status {
        source_id: String,
        page: usize,
        status: u16,
        body: String,
    },

    /// No answer within the per-request timeout.
    #[error("request to {source_id} timed out after {seconds}s (page {page})")]
    Timeout {
        source_id: String,
        page: usize,
        seconds: u64,
    },

    /// The page body could not be decoded.
    #[error("malformed page {page} from {source_id}: {message}")]
    Decode {
        source_id: String,
        page: usize,
        message: String,
    },

    /// The next pointer leads back to a page already read.
    #[error("pagination of {source_id} loops back to {cursor} (page {page})")]
    CursorCycle {
        source_id: String,
        page: usize,
        cursor: String,
    },
}

impl FetchError {
    /// True for network, status and timeout failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::Status { .. } | FetchError::Timeout { .. }
        )
    }

    /// True when repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A running total that no longer fits the counter.
///
/// Raised instead of wrapping, so a report never shows a corrupted sum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sum of {metric} for '{key}' overflows")]
pub struct OverflowError {
    pub key: String,
    pub metric: Metric,
}

impl OverflowError {
    pub fn new(key: &str, metric: Metric) -> Self {
        Self {
            key: key.to_string(),
            metric,
        }
    }
}

/// A reconciliation input that makes suppression meaningless.
///
/// These are reported as warnings; the reconciliation still completes and
/// errs toward reporting too much.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationInputError {
    #[error("reference key set is empty; nothing can be suppressed")]
    EmptyReference,

    #[error("candidate key set is empty; nothing to compare")]
    EmptyCandidates,
}
