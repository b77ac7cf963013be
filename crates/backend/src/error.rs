use thiserror::Error;
use value::{RecordId, ScalarTag};

/// Failures a [`crate::Backend`] implementation can raise (spec §4.5, §7).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no record with id {0} in collection {1:?}")]
    NotFound(RecordId, String),

    #[error("index {index:?} failed to apply to a record being written: {reason}")]
    IndexApply { index: String, reason: String },

    #[error(
        "index {index:?} computed value type {new}, but persisted state says {existing}"
    )]
    IndexTypeMismatch {
        index: String,
        existing: ScalarTag,
        new: ScalarTag,
    },

    /// Wraps a lower-level failure (I/O, a driver error, ...). `retriable`
    /// tells `init`'s backfill retry loop whether retrying the same call
    /// might succeed (spec §7).
    #[error("backend error (retriable={retriable}): {source}")]
    Other {
        #[source]
        source: anyhow::Error,
        retriable: bool,
    },
}

impl BackendError {
    pub fn other(source: impl Into<anyhow::Error>, retriable: bool) -> Self {
        BackendError::Other {
            source: source.into(),
            retriable,
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, BackendError::Other { retriable: true, .. })
    }
}
