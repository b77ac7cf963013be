//! `init` reconciliation and the background reclaim tick (spec §4.4, §4.6).
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use backend::{Backend, BackendError};
use chrono::Utc;
use errors::StoreError;
use schema::{reconcile, IndexEntry, IndexLifecycleState, IndexSpec, SchemaState};
use tokio::sync::RwLock;
use tracing::{info, info_span, warn, Instrument};

use crate::config::LifecycleConfig;
use crate::error_ext::from_backend_error;

/// Owns reconciliation (`init`) and the one background worker per process
/// that emits heartbeats and runs the reclaim tick (spec §5 "Background
/// activity").
pub struct LifecycleEngine {
    backend: Arc<dyn Backend>,
    config: LifecycleConfig,
    process_id: String,
    /// Every collection/index-set this process currently relies on, so the
    /// background worker knows what to keep heartbeating for (spec §5:
    /// "any process calling `init` must be heartbeating for the duration
    /// it relies on those indexes").
    declared: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl LifecycleEngine {
    pub fn new(backend: Arc<dyn Backend>, config: LifecycleConfig, process_id: String) -> Self {
        LifecycleEngine {
            backend,
            config,
            process_id,
            declared: RwLock::new(HashMap::new()),
        }
    }

    /// Spawn the background heartbeat/reclaim worker. Returns a handle the
    /// `Store` holds onto and aborts on drop — there is no other way to
    /// cancel it (spec §5: every operation is non-cancellable except
    /// `backfill_index`).
    pub fn spawn_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.config.heartbeat_period);
            loop {
                ticker.tick().await;
                engine.tick().await;
            }
        })
    }

    async fn tick(&self) {
        let declared = self.declared.read().await.clone();
        for (collection, names) in declared {
            let now = Utc::now();
            if let Err(e) = self
                .backend
                .heartbeat(&self.process_id, &collection, &names, now)
                .await
            {
                warn!(%collection, error = %e, "heartbeat failed");
                continue;
            }
            if let Err(e) = reclaim_tick(self.backend.as_ref(), &collection, now, &self.config)
                .instrument(info_span!("reclaim_tick", %collection))
                .await
            {
                warn!(%collection, error = %e, "reclaim tick failed");
            }
        }
    }

    /// `init(collection, indexes)`: blocking and idempotent — does not
    /// return until every declared index is active (spec §4.4).
    pub async fn init(
        &self,
        collection: &str,
        declared: &[IndexSpec],
    ) -> Result<(), StoreError> {
        let span = info_span!("init", %collection);
        async {
            let names: BTreeSet<String> =
                declared.iter().map(|s| s.logical_name().to_string()).collect();

            let persisted = self
                .backend
                .read_schema(collection)
                .await
                .map_err(|e| from_backend_error(collection, e))?;
            let plan = reconcile(declared, &persisted);

            if let Some(name) = plan.conflicts.first() {
                return Err(StoreError::InvalidKeyFn {
                    name: name.clone(),
                    reason: format!(
                        "index {name:?} is already persisted with a different key function"
                    ),
                });
            }

            for spec in &plan.to_build {
                self.build_index(collection, spec).await?;
            }
            for name in &plan.to_touch {
                self.touch_index(collection, name).await?;
            }

            self.declared
                .write()
                .await
                .entry(collection.to_string())
                .or_default()
                .extend(names.clone());

            let now = Utc::now();
            self.backend
                .heartbeat(&self.process_id, collection, &names, now)
                .await
                .map_err(|e| from_backend_error(collection, e))?;

            self.wait_until_active(collection, &names).await?;
            info!(%collection, indexes = names.len(), "init complete");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn build_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), StoreError> {
        let now = Utc::now();
        let building = IndexEntry {
            key_fn_blob: spec.key_fn().blob().to_vec(),
            value_type: None,
            created_at: now,
            last_seen_at: now,
            state: IndexLifecycleState::Building,
        };
        with_retry(collection, || {
            let backend = self.backend.clone();
            let collection = collection.to_string();
            let name = spec.logical_name().to_string();
            let entry = building.clone();
            async move { backend.upsert_index_entry(&collection, &name, entry).await }
        })
        .await?;

        with_retry(collection, || {
            let backend = self.backend.clone();
            let collection = collection.to_string();
            let spec = spec.clone();
            async move { backend.backfill_index(&collection, &spec).await }
        })
        .await?;

        let entry = self
            .backend
            .read_schema(collection)
            .await
            .map_err(|e| from_backend_error(collection, e))?
            .get(spec.logical_name())
            .cloned()
            .unwrap_or(building);
        let active = IndexEntry {
            state: IndexLifecycleState::Active,
            last_seen_at: Utc::now(),
            ..entry
        };
        self.backend
            .upsert_index_entry(collection, spec.logical_name(), active)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    async fn touch_index(&self, collection: &str, name: &str) -> Result<(), StoreError> {
        let schema = self
            .backend
            .read_schema(collection)
            .await
            .map_err(|e| from_backend_error(collection, e))?;
        let Some(mut entry) = schema.get(name).cloned() else {
            return Ok(());
        };
        entry.last_seen_at = Utc::now();
        // Re-declaring a retiring index revives it immediately rather than
        // waiting for the next reclaim tick (spec §4.6 step 4).
        if matches!(entry.state, IndexLifecycleState::Retiring { .. }) {
            entry.state = IndexLifecycleState::Active;
        }
        self.backend
            .upsert_index_entry(collection, name, entry)
            .await
            .map_err(|e| from_backend_error(collection, e))
    }

    async fn wait_until_active(
        &self,
        collection: &str,
        names: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        for _ in 0..200 {
            let schema = self
                .backend
                .read_schema(collection)
                .await
                .map_err(|e| from_backend_error(collection, e))?;
            if names.iter().all(|n| schema.get(n).is_some_and(|e| e.is_active())) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Err(StoreError::backend(
            anyhow::anyhow!("timed out waiting for indexes to become active on {collection:?}"),
            true,
        ))
    }
}

/// Retries a backend call while it fails with `retriable=true`, using
/// exponential backoff (spec §7: "`init` retries backfill on
/// `BackendError.retriable=true` with exponential backoff; everything
/// else propagates").
async fn with_retry<F, Fut>(collection: &str, mut make_call: F) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), BackendError>>,
{
    let mut delay = Duration::from_millis(20);
    for attempt in 0..6 {
        match make_call().await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retriable() && attempt < 5 => {
                warn!(%collection, attempt, error = %e, "retrying after backend error");
                tokio::time::sleep(delay).await;
                delay *= 2;
            },
            Err(e) => return Err(from_backend_error(collection, e)),
        }
    }
    unreachable!("loop always returns on its last iteration")
}

/// One reclaim tick for a single collection (spec §4.6): prune stale
/// heartbeats, demote abandoned active indexes to retiring, revive
/// re-declared retiring indexes, and drop indexes that have sat retiring
/// past `TTL₂`.
async fn reclaim_tick(
    backend: &dyn Backend,
    collection: &str,
    now: chrono::DateTime<Utc>,
    config: &LifecycleConfig,
) -> Result<(), StoreError> {
    backend
        .prune_stale_heartbeats(collection, now, config.heartbeat_ttl)
        .await
        .map_err(|e| from_backend_error(collection, e))?;

    let live = backend
        .live_declared_indexes(collection)
        .await
        .map_err(|e| from_backend_error(collection, e))?;

    let schema: SchemaState = backend
        .read_schema(collection)
        .await
        .map_err(|e| from_backend_error(collection, e))?;

    for (name, entry) in schema.iter() {
        match &entry.state {
            IndexLifecycleState::Active if !live.contains(name) => {
                let mut updated = entry.clone();
                updated.state = IndexLifecycleState::Retiring { retiring_since: now };
                backend
                    .upsert_index_entry(collection, name, updated)
                    .await
                    .map_err(|e| from_backend_error(collection, e))?;
                info!(%collection, index = %name, "index has no live declarer, marking retiring");
            },
            IndexLifecycleState::Retiring { retiring_since } => {
                if live.contains(name) {
                    let mut updated = entry.clone();
                    updated.state = IndexLifecycleState::Active;
                    backend
                        .upsert_index_entry(collection, name, updated)
                        .await
                        .map_err(|e| from_backend_error(collection, e))?;
                    info!(%collection, index = %name, "index re-declared, reviving");
                } else if now.signed_duration_since(*retiring_since)
                    > chrono::Duration::from_std(config.retire_ttl)
                        .unwrap_or_else(|_| chrono::Duration::max_value())
                {
                    backend
                        .drop_index(collection, name)
                        .await
                        .map_err(|e| from_backend_error(collection, e))?;
                    info!(%collection, index = %name, "dropped retiring index past TTL");
                }
            },
            _ => {},
        }
    }
    Ok(())
}
