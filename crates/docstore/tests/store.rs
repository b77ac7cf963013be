//! End-to-end scenarios against `docstore::Store` over the in-memory
//! backend (spec §8's six testable properties).
use std::sync::Arc;
use std::time::Duration;

use backend::{Backend, InMemoryBackend};
use docstore::{
    DocValue, Document, Handle, IndexSpec, KeyFunction, LifecycleConfig, Scalar, ScalarTag, Store,
    StoreConfig, StoreError,
};

fn init_test_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    // A best-effort subscriber so `RUST_LOG=debug cargo test -- --nocapture`
    // shows the lifecycle engine's and backend's spans; installed once per
    // process since tests run concurrently.
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn store() -> Store {
    init_test_tracing();
    Store::new(StoreConfig::new(Arc::new(InMemoryBackend::new())))
}

fn doc(pairs: &[(&str, DocValue)]) -> Document {
    let mut d = Document::default();
    for (k, v) in pairs {
        d.insert(*k, v.clone());
    }
    d
}

#[tokio::test]
async fn crud_round_trip_through_the_facade() {
    let store = store();
    store.init("users", vec![]).await.unwrap();

    let id = store
        .create(
            "users",
            doc(&[("name", DocValue::Scalar(Scalar::Str("ada".into())))]),
        )
        .await
        .unwrap();
    let got = store.get("users", id).await.unwrap();
    assert_eq!(
        got.get("name"),
        Some(&DocValue::Scalar(Scalar::Str("ada".into())))
    );

    store
        .update(
            "users",
            id,
            doc(&[("name", DocValue::Scalar(Scalar::Str("ada2".into())))]),
        )
        .await
        .unwrap();
    assert_eq!(
        store.get("users", id).await.unwrap().get("name"),
        Some(&DocValue::Scalar(Scalar::Str("ada2".into())))
    );

    store.delete("users", id).await.unwrap();
    assert!(matches!(
        store.get("users", id).await.unwrap_err(),
        StoreError::NotFound { .. }
    ));
}

#[tokio::test]
async fn list_rejects_a_condition_on_an_index_that_was_never_declared() {
    let store = store();
    store.init("users", vec![]).await.unwrap();
    let handle = Handle::new("users", "age", ScalarTag::Int);
    let cond = handle.eq(Scalar::Int(1)).unwrap();
    let err = store.list("users", &[cond]).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownIndex { .. }));
}

#[tokio::test]
async fn list_rejects_a_condition_built_from_a_handle_with_the_wrong_value_type() {
    let store = store();
    store.init("users", vec![IndexSpec::field("age")]).await.unwrap();

    // `Handle::new` is public, so nothing stops a caller from building one
    // with a `value_type` that disagrees with what's actually persisted for
    // "age" (`Int`) — the condition still passes `Handle::eq` because that
    // check only compares against the handle's own (wrong) claim.
    let mismatched_handle = Handle::new("users", "age", ScalarTag::Str);
    let cond = mismatched_handle.eq(Scalar::Str("30".into())).unwrap();

    let err = store.list("users", &[cond]).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidCondition(_)));
}

#[tokio::test]
async fn range_query_over_a_declared_index() {
    let store = store();
    let age_index = IndexSpec::field("age");
    store.init("users", vec![age_index]).await.unwrap();

    for age in [18, 25, 40] {
        store
            .create("users", doc(&[("age", DocValue::Scalar(Scalar::Int(age)))]))
            .await
            .unwrap();
    }

    let handle = store.index_handle("users", "age").await.unwrap();
    let cond = handle.ge(Scalar::Int(20)).unwrap();
    let rows = store.list("users", &[cond]).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn derived_index_lower_cases_the_email_field() {
    let store = store();
    let lower_email = IndexSpec::new("by_email", KeyFunction::field("email").lower());
    store.init("users", vec![lower_email]).await.unwrap();

    store
        .create(
            "users",
            doc(&[(
                "email",
                DocValue::Scalar(Scalar::Str("Ada@Example.com".into())),
            )]),
        )
        .await
        .unwrap();

    let handle = store.index_handle("users", "by_email").await.unwrap();
    let cond = handle.eq(Scalar::Str("ada@example.com".into())).unwrap();
    let rows = store.list("users", &[cond]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn a_null_key_fn_result_is_rejected_on_write() {
    let store = store();
    let name_index = IndexSpec::field("name");
    store.init("users", vec![name_index]).await.unwrap();

    let err = store
        .create("users", doc(&[("age", DocValue::Scalar(Scalar::Int(1)))]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::IndexApply { .. }));
}

#[tokio::test]
async fn an_index_declared_by_either_of_two_overlapping_processes_stays_active() {
    let backend = Arc::new(InMemoryBackend::new());

    let proc_a = Store::new(StoreConfig::new(backend.clone()).with_process_id("proc-a"));
    let proc_b = Store::new(StoreConfig::new(backend.clone()).with_process_id("proc-b"));

    let by_age = IndexSpec::field("age");
    proc_a.init("users", vec![by_age.clone()]).await.unwrap();
    // Same logical_name and key_fn blob as proc_a's: reconciliation on
    // proc_b's init sees it already built and only has to touch it.
    proc_b.init("users", vec![by_age]).await.unwrap();

    proc_a
        .create("users", doc(&[("age", DocValue::Scalar(Scalar::Int(30)))]))
        .await
        .unwrap();

    let handle = proc_b.index_handle("users", "age").await.unwrap();
    let cond = handle.ge(Scalar::Int(0)).unwrap();
    let rows = proc_b.list("users", &[cond]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn an_index_declared_by_no_live_process_is_eventually_reclaimed() {
    init_test_tracing();
    let backend = Arc::new(InMemoryBackend::new());
    // Fast tunables so the reclaim tick sweeps within the test's budget
    // instead of waiting out the suggested real-world 30s/150s/24h defaults.
    let fast = LifecycleConfig {
        heartbeat_period: Duration::from_millis(15),
        heartbeat_ttl: Duration::from_millis(40),
        retire_ttl: Duration::from_millis(40),
    };

    let proc_a = Store::new(
        StoreConfig::new(backend.clone())
            .with_process_id("proc-a")
            .with_lifecycle(fast),
    );
    let proc_b = Store::new(
        StoreConfig::new(backend.clone())
            .with_process_id("proc-b")
            .with_lifecycle(fast),
    );

    proc_a
        .init(
            "users",
            vec![IndexSpec::field("age"), IndexSpec::field("legacy_field")],
        )
        .await
        .unwrap();
    proc_b.init("users", vec![IndexSpec::field("age")]).await.unwrap();

    proc_a
        .create("users", doc(&[("age", DocValue::Scalar(Scalar::Int(1)))]))
        .await
        .unwrap();

    // proc_a stops heartbeating; only proc_b's reclaim tick keeps running.
    drop(proc_a);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let schema = backend.read_schema("users").await.unwrap();
    assert!(
        schema.get("legacy_field").is_none(),
        "index declared by no live process should be dropped"
    );
    assert!(
        schema.get("age").is_some_and(|e| e.is_active()),
        "index still declared by proc_b should stay active"
    );

    // age is still usable through proc_b.
    let handle = proc_b.index_handle("users", "age").await.unwrap();
    let cond = handle.ge(Scalar::Int(0)).unwrap();
    assert_eq!(proc_b.list("users", &[cond]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn index_type_mismatch_is_rejected() {
    let store = store();
    store.init("users", vec![IndexSpec::field("age")]).await.unwrap();

    store
        .create("users", doc(&[("age", DocValue::Scalar(Scalar::Int(1)))]))
        .await
        .unwrap();

    let err = store
        .create(
            "users",
            doc(&[("age", DocValue::Scalar(Scalar::Str("thirty".into())))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::IndexTypeMismatch { .. }));
}

#[tokio::test]
async fn test_key_fn_round_trips_through_the_facade() {
    let store = store();
    let kf = KeyFunction::field("email").lower();
    let sample = doc(&[(
        "email",
        DocValue::Scalar(Scalar::Str("Ada@Example.com".into())),
    )]);
    let round_tripped = store.test_key_fn(&kf, &sample).unwrap();
    assert_eq!(kf, round_tripped);
}

#[tokio::test]
async fn supported_index_types_names_every_scalar_tag() {
    let store = Store::new(StoreConfig::new(Arc::new(InMemoryBackend::new())));
    let tags = store.supported_index_types();
    for expected in [
        ScalarTag::Int,
        ScalarTag::Float,
        ScalarTag::Bool,
        ScalarTag::Str,
        ScalarTag::Id,
        ScalarTag::Timestamp,
    ] {
        assert!(tags.contains(&expected));
    }
}
