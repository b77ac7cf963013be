//! Error kinds surfaced by the document-store facade.
//!
//! Every fallible `docstore::Store` operation returns a [`StoreError`].
//! Internal crates (`keyfn`, `query`, `schema`, `backend`) define their own
//! narrow error types and get converted into a `StoreError` at the facade
//! boundary, the same way the teacher keeps crate-local error enums and
//! tags them onto an `anyhow::Error` chain at the edges. Building a
//! `Condition` from a `Handle` (crate `query`) is not itself a `Store`
//! operation, so it raises `query::InvalidConditionError` directly rather
//! than a `StoreError`; `Store::list` converts that same error kind into
//! `StoreError::InvalidCondition` when it re-checks conditions against the
//! schema (see DESIGN.md).

use thiserror::Error;

/// Top level error returned by every `docstore::Store` operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists with the given identifier.
    #[error("no record with id {id} in collection {collection:?}")]
    NotFound { collection: String, id: String },

    /// A query referenced an index that is not active on this collection.
    #[error("index {index:?} is not active on collection {collection:?}")]
    UnknownIndex { collection: String, index: String },

    /// A `Condition` was malformed: cross-type comparison, a non-scalar
    /// literal, or (conceptually) a boolean combinator.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// A key function raised, or produced null/unsupported output, while
    /// applying to a record being written.
    #[error("index {index:?} failed to apply to record: {reason}")]
    IndexApply { index: String, reason: String },

    /// The value type newly computed for an index disagrees with what is
    /// already persisted for it.
    #[error(
        "index {index:?} computed value type {new:?}, but persisted state says {existing:?}"
    )]
    IndexTypeMismatch {
        index: String,
        existing: String,
        new: String,
    },

    /// A `KeyFunction` could not be serialized, deserialized, or
    /// round-tripped.
    #[error("invalid key function {name:?}: {reason}")]
    InvalidKeyFn { name: String, reason: String },

    /// The document supplied to `create`/`update` is not well-formed.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Wraps a lower-level backend failure; `retriable` tells the caller
    /// (and the lifecycle engine's backfill retry loop) whether retrying
    /// the same call might succeed.
    #[error("backend error (retriable={retriable}): {source}")]
    Backend {
        #[source]
        source: anyhow::Error,
        retriable: bool,
    },
}

impl StoreError {
    pub fn backend(source: impl Into<anyhow::Error>, retriable: bool) -> Self {
        StoreError::Backend {
            source: source.into(),
            retriable,
        }
    }

    /// Whether the lifecycle engine's backfill retry loop should retry
    /// this error (spec: only `BackendError.retriable=true` is retried;
    /// every other kind propagates immediately).
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Backend { retriable: true, .. })
    }
}
