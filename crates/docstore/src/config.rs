use std::sync::Arc;
use std::time::Duration;

use backend::Backend;
use value::RecordId;

/// Tunables for the lifecycle engine's background worker (spec §5, §4.6).
/// Defaults match the suggested values in spec §5.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    /// How often the worker emits a heartbeat and runs the reclaim tick
    /// (`H`).
    pub heartbeat_period: Duration,
    /// How long a heartbeat is honored after it stops arriving before its
    /// declared indexes lose their "live" status (`TTL₁`).
    pub heartbeat_ttl: Duration,
    /// How long an index stays `retiring` before it is physically dropped
    /// (`TTL₂`).
    pub retire_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            heartbeat_period: Duration::from_secs(30),
            heartbeat_ttl: Duration::from_secs(150),
            retire_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// The two opaque dimensions of backend selection (spec §6) plus the
/// lifecycle tunables, gathered into one struct the way the teacher
/// threads a single config object through at construction.
pub struct StoreConfig {
    pub backend: Arc<dyn Backend>,
    pub lifecycle: LifecycleConfig,
    pub process_id: String,
}

impl StoreConfig {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        StoreConfig {
            backend,
            lifecycle: LifecycleConfig::default(),
            process_id: RecordId::generate().to_string(),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = process_id.into();
        self
    }
}
