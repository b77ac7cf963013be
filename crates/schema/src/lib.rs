//! Declared vs. persisted index descriptors: diff and reconciliation plan
//! (spec §4.4).
mod diff;
mod spec;
mod state;

pub use diff::{reconcile, ReconciliationPlan};
pub use spec::IndexSpec;
pub use state::{IndexEntry, IndexLifecycleState, SchemaState};
