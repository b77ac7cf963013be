use crate::spec::IndexSpec;
use crate::state::SchemaState;

/// The reconciliation plan computed by [`reconcile`] (spec §4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Declared indexes absent from persisted state: build from scratch,
    /// backfill, then mark active.
    pub to_build: Vec<IndexSpec>,
    /// Declared indexes already known to the backend (building, active, or
    /// retiring): just refresh `last_seen_at` / the heartbeat. A retiring
    /// index being re-declared is exactly how spec §4.6 step 4 revives it.
    pub to_touch: Vec<String>,
    /// Declared indexes whose persisted `key_fn` blob disagrees with the
    /// one just declared under the same `logical_name`. Two processes
    /// can't both own one logical name with different definitions — the
    /// caller (the lifecycle engine) turns this into `InvalidKeyFnError`
    /// rather than silently picking one.
    pub conflicts: Vec<String>,
}

/// Three-way diff between the declared set, the persisted state, and
/// (implicitly, via the backend's heartbeat table, which this function
/// does not need to see) other currently-live declared sets (spec §4.4).
pub fn reconcile(declared: &[IndexSpec], persisted: &SchemaState) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    for spec in declared {
        match persisted.get(spec.logical_name()) {
            None => plan.to_build.push(spec.clone()),
            Some(entry) if entry.key_fn_blob == spec.key_fn().blob() => {
                plan.to_touch.push(spec.logical_name().to_string());
            },
            Some(_) => plan.conflicts.push(spec.logical_name().to_string()),
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use keyfn::KeyFunction;
    use value::ScalarTag;

    use super::*;
    use crate::state::IndexLifecycleState;

    fn entry(blob: Vec<u8>, state: IndexLifecycleState) -> crate::state::IndexEntry {
        crate::state::IndexEntry {
            key_fn_blob: blob,
            value_type: Some(ScalarTag::Int),
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
            state,
        }
    }

    #[test]
    fn new_index_goes_to_build() {
        let declared = vec![IndexSpec::field("age")];
        let persisted = SchemaState::new();
        let plan = reconcile(&declared, &persisted);
        assert_eq!(plan.to_build.len(), 1);
        assert!(plan.to_touch.is_empty());
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn matching_active_index_is_touched_not_rebuilt() {
        let spec = IndexSpec::field("age");
        let mut persisted = SchemaState::new();
        persisted.insert(
            "age",
            entry(spec.key_fn().blob().to_vec(), IndexLifecycleState::Active),
        );
        let plan = reconcile(&[spec], &persisted);
        assert!(plan.to_build.is_empty());
        assert_eq!(plan.to_touch, vec!["age".to_string()]);
    }

    #[test]
    fn second_init_performs_no_backfill() {
        // Two sequential calls to init(C, S) with identical S: after the
        // first reconciliation promotes "age" to Active, the second
        // reconcile() call against that same persisted state must not
        // re-queue a build (spec §8 round-trip law).
        let spec = IndexSpec::field("age");
        let mut persisted = SchemaState::new();
        persisted.insert(
            "age",
            entry(spec.key_fn().blob().to_vec(), IndexLifecycleState::Active),
        );
        let first = reconcile(&[IndexSpec::field("age")], &persisted);
        let second = reconcile(&[IndexSpec::field("age")], &persisted);
        assert_eq!(first, second);
        assert!(first.to_build.is_empty());
    }

    #[test]
    fn conflicting_key_fn_under_same_name_is_reported() {
        let mut persisted = SchemaState::new();
        persisted.insert(
            "email_lower",
            entry(
                KeyFunction::field("email").blob().to_vec(),
                IndexLifecycleState::Active,
            ),
        );
        let declared = vec![IndexSpec::new(
            "email_lower",
            KeyFunction::field("email").lower(),
        )];
        let plan = reconcile(&declared, &persisted);
        assert_eq!(plan.conflicts, vec!["email_lower".to_string()]);
    }
}
