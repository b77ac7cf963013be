//! A document-store abstraction layer: a thin, backend-agnostic API for
//! storing documents and maintaining declarative secondary indexes over
//! them, with index lifecycle (build/backfill/retire) handled
//! automatically across overlapping processes.
//!
//! The crate is organized the way the rest of this workspace is: narrow,
//! single-purpose crates (`value`, `keyfn`, `query`, `schema`, `backend`)
//! compose here into the public [`Store`] facade. Most applications only
//! need this crate and `backend` (for a concrete [`backend::Backend`]
//! implementation). End-to-end scenarios live in `tests/`; this crate's
//! own modules carry only the wiring.
mod config;
mod error_ext;
mod facade;
mod lifecycle;

pub use config::{LifecycleConfig, StoreConfig};
pub use facade::Store;

// Re-exported so a consumer only needs to depend on `docstore` to build
// documents, conditions, and index specs.
pub use backend::{Backend, BackendError};
pub use errors::StoreError;
pub use keyfn::KeyFunction;
pub use query::{Condition, Handle, NormalizedPlan, Query, RangeInterval};
pub use schema::{IndexEntry, IndexLifecycleState, IndexSpec, SchemaState};
pub use value::{DocValue, Document, RecordId, Scalar, ScalarTag};
