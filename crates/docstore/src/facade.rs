//! The public `Store` facade (spec §4.7, §6): composes `init`, `create`,
//! `get`, `update`, `delete`, `list`, gluing the lifecycle engine, the
//! backend, and the condition DSL together.
use std::collections::HashMap;
use std::sync::Arc;

use backend::Backend;
use errors::StoreError;
use keyfn::KeyFunction;
use query::{Condition, Handle, InvalidConditionError, Query};
use schema::IndexSpec;
use tokio::sync::RwLock;
use value::{Document, RecordId, ScalarTag};

use crate::config::StoreConfig;
use crate::error_ext::{from_backend_error, from_condition_error};
use crate::lifecycle::LifecycleEngine;

/// The facade composes the lifecycle engine and the backend; it holds no
/// mutable record/index state of its own (spec §5 "Resource policy").
pub struct Store {
    backend: Arc<dyn Backend>,
    lifecycle: Arc<LifecycleEngine>,
    /// Per-collection declared `IndexSpec`s, kept only so `index_handle`
    /// and error messages can report what *this process* declared; the
    /// source of truth for what's queryable is always a fresh
    /// `read_schema` call against the backend.
    declared: RwLock<HashMap<String, Vec<IndexSpec>>>,
    worker: tokio::task::JoinHandle<()>,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let lifecycle = Arc::new(LifecycleEngine::new(
            config.backend.clone(),
            config.lifecycle,
            config.process_id,
        ));
        let worker = lifecycle.spawn_worker();
        Store {
            backend: config.backend,
            lifecycle,
            declared: RwLock::new(HashMap::new()),
            worker,
        }
    }

    /// `init(collection, indexes)` (spec §6). Blocks until every declared
    /// index is active.
    pub async fn init(&self, collection: &str, indexes: Vec<IndexSpec>) -> Result<(), StoreError> {
        self.lifecycle.init(collection, &indexes).await?;
        self.declared
            .write()
            .await
            .insert(collection.to_string(), indexes);
        Ok(())
    }

    pub async fn create(&self, collection: &str, doc: Document) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        self.backend
            .put_record(collection, id, doc)
            .await
            .map_err(|e| from_backend_error(collection, e))?;
        Ok(id)
    }

    pub async fn get(&self, collection: &str, id: RecordId) -> Result<Document, StoreError> {
        self.backend
            .get_record(collection, id)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    pub async fn update(
        &self,
        collection: &str,
        id: RecordId,
        doc: Document,
    ) -> Result<(), StoreError> {
        self.backend
            .replace_record(collection, id, doc)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    pub async fn delete(&self, collection: &str, id: RecordId) -> Result<(), StoreError> {
        self.backend
            .delete_record(collection, id)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    /// `index_handle(collection, name)` (spec §6): the only way to obtain
    /// a [`Handle`] to build conditions against.
    pub async fn index_handle(&self, collection: &str, name: &str) -> Result<Handle, StoreError> {
        let schema = self
            .backend
            .read_schema(collection)
            .await
            .map_err(|e| from_backend_error(collection, e))?;
        let value_type = schema
            .get(name)
            .filter(|e| e.is_active())
            .and_then(|e| e.value_type)
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: collection.to_string(),
                index: name.to_string(),
            })?;
        Ok(Handle::new(collection, name, value_type))
    }

    /// `list(collection, *conditions)` (spec §6): validates every
    /// referenced index is still active, re-checks each condition's literal
    /// against the index's *current* persisted value_type, normalizes into
    /// a range plan, and executes it against the backend.
    ///
    /// `Handle::new` is public (the `query` crate has no way to seal it to
    /// `index_handle`'s callers without a dependency the other direction),
    /// so a caller can build a `Handle` carrying a stale or simply wrong
    /// `value_type` and still get a `Condition` past `Handle::eq`/`lt`/etc. —
    /// that check only compares the literal against whatever `value_type`
    /// the `Handle` itself claims, not against the schema. This is the
    /// second, authoritative check: it catches that case and is why
    /// `InvalidConditionError` is a real `list` failure mode, not just a
    /// theoretical one (spec §6, §7).
    pub async fn list(
        &self,
        collection: &str,
        conditions: &[Condition],
    ) -> Result<Vec<(RecordId, Document)>, StoreError> {
        let schema = self
            .backend
            .read_schema(collection)
            .await
            .map_err(|e| from_backend_error(collection, e))?;
        for cond in conditions {
            let name = cond.handle().index_name();
            let Some(entry) = schema.get(name).filter(|e| e.is_active()) else {
                return Err(StoreError::UnknownIndex {
                    collection: collection.to_string(),
                    index: name.to_string(),
                });
            };
            let literal_type = cond.value().tag();
            if let Some(index_type) = entry.value_type {
                if index_type != literal_type {
                    return Err(from_condition_error(InvalidConditionError::CrossType {
                        index: name.to_string(),
                        index_type,
                        literal_type,
                    }));
                }
            }
        }

        let plan = Query::new(conditions.to_vec()).plan();
        self.backend
            .list_records(collection, &plan)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    /// `supported_index_types()` (spec §6).
    pub fn supported_index_types(&self) -> &'static [ScalarTag] {
        value::SUPPORTED_SCALAR_TAGS
    }

    /// `test_key_fn(fn)` (spec §6, §4.2).
    pub fn test_key_fn(
        &self,
        key_fn: &KeyFunction,
        sample_doc: &Document,
    ) -> Result<KeyFunction, StoreError> {
        keyfn::test_key_fn(key_fn, sample_doc)
            .map_err(|e| crate::error_ext::from_key_fn_error("<test_key_fn>", e))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
