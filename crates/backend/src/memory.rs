//! The required in-memory reference backend (spec §4.5): each collection
//! is `(mapping id -> document)` plus, per active/building index, an
//! ordered multi-map from index value to id. Grounded on the teacher's
//! `indexing::backend_in_memory_indexes` (the same "records map + ordered
//! per-index multimap, one readers-writer lock per collection" shape),
//! reimplemented against this crate's own `Backend` trait rather than the
//! teacher's transaction/persistence-log machinery.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyfn::KeyFunction;
use query::{NormalizedPlan, RangeInterval};
use schema::{IndexEntry, IndexLifecycleState, IndexSpec, SchemaState};
use value::{Document, RecordId, Scalar, ScalarTag};

use crate::contract::{Backend, HeartbeatRow};
use crate::error::BackendError;

#[derive(Default)]
struct CollectionState {
    records: HashMap<RecordId, Document>,
    indexes: HashMap<String, BTreeMap<Scalar, BTreeSet<RecordId>>>,
    schema: SchemaState,
    heartbeats: HashMap<String, HeartbeatRow>,
}

/// The required reference backend: no persistence, no network, no cross
/// process locking — one `Arc<RwLock<_>>` per collection to realize the
/// "many concurrent readers, single writer" discipline of spec §5.
#[derive(Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, Arc<RwLock<CollectionState>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Arc<RwLock<CollectionState>> {
        if let Some(c) = self.collections.read().unwrap().get(name) {
            return c.clone();
        }
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(CollectionState::default())))
            .clone()
    }
}

/// One index write still pending commit: the scalar a key function
/// produced for a record, and whether this is the first time that
/// index's value_type was observed (spec §4.2: "On first build, the
/// engine applies the function to one existing record ... to derive the
/// value_type tag").
struct PendingWrite {
    index_name: String,
    scalar: Scalar,
    newly_inferred_type: Option<ScalarTag>,
}

/// Compute every active/building index's value for `doc` without
/// mutating `schema` — so a failure partway through leaves nothing
/// committed (spec §3 Invariants: "a record whose key function raises or
/// returns null ... causes the write to fail and leave the store
/// unchanged").
fn compute_writes(schema: &SchemaState, doc: &Document) -> Result<Vec<PendingWrite>, BackendError> {
    let mut out = Vec::new();
    for (name, entry) in schema.iter() {
        if matches!(entry.state, IndexLifecycleState::Retiring { .. }) {
            continue;
        }
        let key_fn = KeyFunction::from_blob(&entry.key_fn_blob)
            .map_err(|e| BackendError::other(anyhow::anyhow!(e.to_string()), false))?;
        let scalar = key_fn.apply(doc).map_err(|e| BackendError::IndexApply {
            index: name.clone(),
            reason: e.to_string(),
        })?;
        let tag = scalar.tag();
        let newly_inferred_type = match entry.value_type {
            Some(existing) if existing == tag => None,
            Some(existing) => {
                return Err(BackendError::IndexTypeMismatch {
                    index: name.clone(),
                    existing,
                    new: tag,
                })
            },
            None => Some(tag),
        };
        out.push(PendingWrite {
            index_name: name.clone(),
            scalar,
            newly_inferred_type,
        });
    }
    Ok(out)
}

/// Recompute old index values for a record being replaced or deleted, so
/// its stale entries can be removed. Unlike `compute_writes`, failures
/// here are tolerated (logged) rather than propagated: the record was
/// already accepted under the schema that existed when it was written,
/// and a newer index that hasn't backfilled this record yet simply has
/// nothing to remove.
fn compute_old_values(schema: &SchemaState, doc: &Document) -> Vec<(String, Scalar)> {
    let mut out = Vec::new();
    for (name, entry) in schema.iter() {
        if matches!(entry.state, IndexLifecycleState::Retiring { .. }) {
            continue;
        }
        let Ok(key_fn) = KeyFunction::from_blob(&entry.key_fn_blob) else {
            continue;
        };
        match key_fn.apply(doc) {
            Ok(scalar) => out.push((name.clone(), scalar)),
            Err(e) => {
                tracing::debug!(index = %name, error = %e, "no stale index entry to remove");
            },
        }
    }
    out
}

fn commit_writes(state: &mut CollectionState, id: RecordId, writes: Vec<PendingWrite>) {
    for w in &writes {
        if let Some(tag) = w.newly_inferred_type {
            if let Some(mut entry) = state.schema.get(&w.index_name).cloned() {
                entry.value_type = Some(tag);
                state.schema.insert(w.index_name.clone(), entry);
            }
        }
    }
    for w in writes {
        state
            .indexes
            .entry(w.index_name)
            .or_default()
            .entry(w.scalar)
            .or_default()
            .insert(id);
    }
}

fn remove_stale(state: &mut CollectionState, id: RecordId, old_values: Vec<(String, Scalar)>) {
    for (name, scalar) in old_values {
        if let Some(map) = state.indexes.get_mut(&name) {
            if let Some(ids) = map.get_mut(&scalar) {
                ids.remove(&id);
                if ids.is_empty() {
                    map.remove(&scalar);
                }
            }
        }
    }
}

fn scalar_bound_range(interval: &RangeInterval) -> (Bound<Scalar>, Bound<Scalar>) {
    (interval.lower.clone(), interval.upper.clone())
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn physical_name(&self, collection: &str) -> String {
        collection.to_string()
    }

    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        doc: Document,
    ) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();
        let writes = compute_writes(&state.schema, &doc)?;
        commit_writes(&mut state, id, writes);
        state.records.insert(id, doc);
        Ok(())
    }

    async fn replace_record(
        &self,
        collection: &str,
        id: RecordId,
        doc: Document,
    ) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();
        if !state.records.contains_key(&id) {
            return Err(BackendError::NotFound(id, collection.to_string()));
        }
        let writes = compute_writes(&state.schema, &doc)?;
        let old_doc = state.records.get(&id).cloned().expect("checked above");
        let old_values = compute_old_values(&state.schema, &old_doc);
        remove_stale(&mut state, id, old_values);
        commit_writes(&mut state, id, writes);
        state.records.insert(id, doc);
        Ok(())
    }

    async fn get_record(&self, collection: &str, id: RecordId) -> Result<Document, BackendError> {
        let cell = self.collection(collection);
        let state = cell.read().unwrap();
        state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id, collection.to_string()))
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();
        let Some(old_doc) = state.records.remove(&id) else {
            return Err(BackendError::NotFound(id, collection.to_string()));
        };
        let old_values = compute_old_values(&state.schema, &old_doc);
        remove_stale(&mut state, id, old_values);
        Ok(())
    }

    async fn list_records(
        &self,
        collection: &str,
        plan: &NormalizedPlan,
    ) -> Result<Vec<(RecordId, Document)>, BackendError> {
        let cell = self.collection(collection);
        let state = cell.read().unwrap();

        let ranges = match plan {
            NormalizedPlan::Empty => return Ok(Vec::new()),
            NormalizedPlan::Ranges(r) => r,
        };

        if ranges.is_empty() {
            let mut all: Vec<_> = state.records.iter().map(|(id, d)| (*id, d.clone())).collect();
            all.sort_by_key(|(id, _)| *id);
            return Ok(all);
        }

        if ranges.len() == 1 {
            let (name, interval) = ranges.iter().next().expect("len == 1");
            let (lower, upper) = scalar_bound_range(interval);
            let Some(index) = state.indexes.get(name) else {
                return Ok(Vec::new());
            };
            let mut out = Vec::new();
            for (_, ids) in index.range((lower, upper)) {
                for id in ids {
                    if let Some(doc) = state.records.get(id) {
                        out.push((*id, doc.clone()));
                    }
                }
            }
            return Ok(out);
        }

        let mut matching: Option<BTreeSet<RecordId>> = None;
        for (name, interval) in ranges {
            let (lower, upper) = scalar_bound_range(interval);
            let mut ids = BTreeSet::new();
            if let Some(index) = state.indexes.get(name) {
                for (_, matched) in index.range((lower, upper)) {
                    ids.extend(matched.iter().copied());
                }
            }
            matching = Some(match matching {
                None => ids,
                Some(prev) => prev.intersection(&ids).copied().collect(),
            });
        }
        let ids = matching.unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| state.records.get(&id).map(|doc| (id, doc.clone())))
            .collect())
    }

    async fn read_schema(&self, collection: &str) -> Result<SchemaState, BackendError> {
        let cell = self.collection(collection);
        Ok(cell.read().unwrap().schema.clone())
    }

    async fn upsert_index_entry(
        &self,
        collection: &str,
        logical_name: &str,
        entry: IndexEntry,
    ) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        cell.write().unwrap().schema.insert(logical_name, entry);
        Ok(())
    }

    async fn drop_index(&self, collection: &str, logical_name: &str) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();
        state.schema.remove(logical_name);
        state.indexes.remove(logical_name);
        Ok(())
    }

    async fn backfill_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();

        let Some(entry) = state.schema.get(spec.logical_name()).cloned() else {
            return Err(BackendError::other(
                anyhow::anyhow!("backfill_index called before upsert_index_entry"),
                false,
            ));
        };

        let ids: Vec<RecordId> = state.records.keys().copied().collect();
        let mut inferred: Option<ScalarTag> = entry.value_type;
        let mut to_insert = Vec::new();
        for id in ids {
            let doc = state.records.get(&id).expect("iterating known keys").clone();
            let scalar = spec.key_fn().apply(&doc).map_err(|e| BackendError::IndexApply {
                index: spec.logical_name().to_string(),
                reason: e.to_string(),
            })?;
            let tag = scalar.tag();
            match inferred {
                None => inferred = Some(tag),
                Some(t) if t == tag => {},
                Some(t) => {
                    return Err(BackendError::IndexTypeMismatch {
                        index: spec.logical_name().to_string(),
                        existing: t,
                        new: tag,
                    })
                },
            }
            to_insert.push((id, scalar));
        }

        let index_map = state.indexes.entry(spec.logical_name().to_string()).or_default();
        index_map.clear();
        for (id, scalar) in to_insert {
            index_map.entry(scalar).or_default().insert(id);
        }

        if let Some(tag) = inferred {
            let mut updated = entry;
            updated.value_type = Some(tag);
            state.schema.insert(spec.logical_name(), updated);
        }
        Ok(())
    }

    async fn heartbeat(
        &self,
        process_id: &str,
        collection: &str,
        declared: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let cell = self.collection(collection);
        cell.write().unwrap().heartbeats.insert(
            process_id.to_string(),
            HeartbeatRow {
                process_id: process_id.to_string(),
                declared: declared.clone(),
                last_heartbeat: now,
            },
        );
        Ok(())
    }

    async fn prune_stale_heartbeats(
        &self,
        collection: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| BackendError::other(anyhow::anyhow!(e.to_string()), false))?;
        let cell = self.collection(collection);
        let mut state = cell.write().unwrap();
        state
            .heartbeats
            .retain(|_, row| now.signed_duration_since(row.last_heartbeat) <= ttl);
        Ok(())
    }

    async fn live_declared_indexes(
        &self,
        collection: &str,
    ) -> Result<BTreeSet<String>, BackendError> {
        let cell = self.collection(collection);
        let state = cell.read().unwrap();
        Ok(state
            .heartbeats
            .values()
            .flat_map(|row| row.declared.iter().cloned())
            .collect())
    }
}
