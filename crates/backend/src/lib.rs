//! Abstract operations every document-store backend must implement
//! identically (spec §4.5), plus the required in-memory reference
//! implementation.
mod contract;
mod error;
mod memory;

pub use contract::{Backend, HeartbeatRow};
pub use error::BackendError;
pub use memory::InMemoryBackend;

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use keyfn::KeyFunction;
    use query::{Condition, Handle, NormalizedPlan, Query};
    use schema::{IndexEntry, IndexLifecycleState, IndexSpec};
    use value::{DocValue, Document, RecordId, Scalar, ScalarTag};

    use super::*;

    fn doc(fields: &[(&str, DocValue)]) -> Document {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn active_entry(key_fn: &KeyFunction, value_type: ScalarTag) -> IndexEntry {
        IndexEntry {
            key_fn_blob: key_fn.blob().to_vec(),
            value_type: Some(value_type),
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
            state: IndexLifecycleState::Active,
        }
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let backend = InMemoryBackend::new();
        let id = RecordId::generate();
        let record = doc(&[("name", DocValue::Scalar(Scalar::Str("Alex".into())))]);
        backend.put_record("user", id, record.clone()).await.unwrap();
        assert_eq!(backend.get_record("user", id).await.unwrap(), record);

        let updated = doc(&[("name", DocValue::Scalar(Scalar::Str("Alexandra".into())))]);
        backend.replace_record("user", id, updated.clone()).await.unwrap();
        assert_eq!(backend.get_record("user", id).await.unwrap(), updated);

        backend.delete_record("user", id).await.unwrap();
        assert!(backend.get_record("user", id).await.is_err());
    }

    #[tokio::test]
    async fn range_query_over_one_index() {
        let backend = InMemoryBackend::new();
        let age_fn = KeyFunction::field("age");
        backend
            .upsert_index_entry("user", "age", active_entry(&age_fn, ScalarTag::Int))
            .await
            .unwrap();

        for (name, age) in [("Alex", 31), ("Kelly", 29), ("Ben", 27)] {
            let id = RecordId::generate();
            let record = doc(&[
                ("name", DocValue::Scalar(Scalar::Str(name.into()))),
                ("age", DocValue::Scalar(Scalar::Int(age))),
            ]);
            backend.put_record("user", id, record).await.unwrap();
        }

        let handle = Handle::new("user", "age", ScalarTag::Int);
        let query = Query::new(vec![
            handle.ge(Scalar::Int(20)).unwrap(),
            handle.lt(Scalar::Int(30)).unwrap(),
        ]);
        let plan = query.plan();
        let results = backend.list_records("user", &plan).await.unwrap();
        let names: BTreeSet<_> = results
            .iter()
            .map(|(_, d)| d.get("name").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            BTreeSet::from(["Kelly".to_string(), "Ben".to_string()])
        );
    }

    #[tokio::test]
    async fn null_key_fn_result_rejects_the_write() {
        let backend = InMemoryBackend::new();
        let age_fn = KeyFunction::field("age");
        backend
            .upsert_index_entry("user", "age", active_entry(&age_fn, ScalarTag::Int))
            .await
            .unwrap();

        let id = RecordId::generate();
        let record = doc(&[("name", DocValue::Scalar(Scalar::Str("x".into())))]);
        let err = backend.put_record("user", id, record).await.unwrap_err();
        assert!(matches!(err, BackendError::IndexApply { .. }));
        assert!(backend.get_record("user", id).await.is_err());
    }

    #[tokio::test]
    async fn backfill_infers_value_type_from_existing_records() {
        let backend = InMemoryBackend::new();
        let id = RecordId::generate();
        backend
            .put_record(
                "user",
                id,
                doc(&[("age", DocValue::Scalar(Scalar::Int(40)))]),
            )
            .await
            .unwrap();

        let spec = IndexSpec::field("age");
        backend
            .upsert_index_entry(
                "user",
                "age",
                IndexEntry {
                    key_fn_blob: spec.key_fn().blob().to_vec(),
                    value_type: None,
                    created_at: Utc::now(),
                    last_seen_at: Utc::now(),
                    state: IndexLifecycleState::Building,
                },
            )
            .await
            .unwrap();
        backend.backfill_index("user", &spec).await.unwrap();

        let schema = backend.read_schema("user").await.unwrap();
        assert_eq!(schema.get("age").unwrap().value_type, Some(ScalarTag::Int));

        let handle = Handle::new("user", "age", ScalarTag::Int);
        let plan = Query::new(vec![Condition::Ge(handle.clone(), Scalar::Int(0))]).plan();
        assert!(matches!(plan, NormalizedPlan::Ranges(_)));
        let results = backend.list_records("user", &plan).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
