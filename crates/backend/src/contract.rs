use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use query::NormalizedPlan;
use schema::{IndexEntry, IndexSpec, SchemaState};
use value::{Document, RecordId};

use crate::error::BackendError;

/// One liveness row: which indexes a process currently relies on, and when
/// it was last heard from (spec §4.5, §5 "Background activity").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRow {
    pub process_id: String,
    pub declared: BTreeSet<String>,
    pub last_heartbeat: DateTime<Utc>,
}

/// The abstract operations every concrete store must implement identically
/// (spec §4.5). Every method is atomic per call; `put_record` and
/// `replace_record` must update every still-relevant index entry and the
/// record body in one atomic step.
///
/// All operations are `async` — not because the in-memory reference
/// implementation needs to await anything, but because a real backend
/// (relational, etc.) does I/O here, and every implementation, in-memory
/// or not, is written against the same trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Maps a collection's opaque logical name to a backend-safe physical
    /// name (spec §3). Exposed so callers/tests can assert the mapping is
    /// injective; the in-memory backend's physical name is the identity.
    fn physical_name(&self, collection: &str) -> String;

    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        doc: Document,
    ) -> Result<(), BackendError>;

    async fn replace_record(
        &self,
        collection: &str,
        id: RecordId,
        doc: Document,
    ) -> Result<(), BackendError>;

    async fn get_record(&self, collection: &str, id: RecordId) -> Result<Document, BackendError>;

    async fn delete_record(&self, collection: &str, id: RecordId) -> Result<(), BackendError>;

    async fn list_records(
        &self,
        collection: &str,
        plan: &NormalizedPlan,
    ) -> Result<Vec<(RecordId, Document)>, BackendError>;

    async fn read_schema(&self, collection: &str) -> Result<SchemaState, BackendError>;

    async fn upsert_index_entry(
        &self,
        collection: &str,
        logical_name: &str,
        entry: IndexEntry,
    ) -> Result<(), BackendError>;

    async fn drop_index(&self, collection: &str, logical_name: &str) -> Result<(), BackendError>;

    /// Idempotent, resumable: computing every index entry for an existing
    /// collection when an index becomes declared (spec §4.5, Glossary).
    async fn backfill_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), BackendError>;

    async fn heartbeat(
        &self,
        process_id: &str,
        collection: &str,
        declared: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<(), BackendError>;

    async fn prune_stale_heartbeats(
        &self,
        collection: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), BackendError>;

    /// The union of index names declared by every heartbeat currently on
    /// file for `collection` — what the reclaim tick needs to decide
    /// whether an active index still has a live declarer (spec §4.6).
    async fn live_declared_indexes(
        &self,
        collection: &str,
    ) -> Result<BTreeSet<String>, BackendError>;
}
