use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use value::ScalarTag;

/// The three states an index entry passes through (spec §3 Lifecycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLifecycleState {
    Building,
    Active,
    Retiring { retiring_since: DateTime<Utc> },
}

/// One persisted row of a collection's `SchemaState` (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub key_fn_blob: Vec<u8>,
    pub value_type: Option<ScalarTag>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub state: IndexLifecycleState,
}

impl IndexEntry {
    pub fn is_active(&self) -> bool {
        matches!(self.state, IndexLifecycleState::Active)
    }
}

/// Persisted, per-collection mapping from logical_name to index metadata
/// (spec §3). Backend-held; the facade only ever sees a snapshot of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaState {
    entries: BTreeMap<String, IndexEntry>,
}

impl SchemaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, logical_name: &str) -> Option<&IndexEntry> {
        self.entries.get(logical_name)
    }

    pub fn insert(&mut self, logical_name: impl Into<String>, entry: IndexEntry) {
        self.entries.insert(logical_name.into(), entry);
    }

    pub fn remove(&mut self, logical_name: &str) -> Option<IndexEntry> {
        self.entries.remove(logical_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }

    /// The live-index set: entries with `state == Active` (spec §3).
    pub fn active_names(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_active())
            .map(|(name, _)| name)
    }
}
