//! Converts the narrow, crate-local error types of `backend`, `query`, and
//! `keyfn` into the facade's `errors::StoreError`. Kept as plain functions
//! rather than `impl From` because none of the involved types live in this
//! crate — the orphan rule would block a trait impl, and a converter
//! function reads the same at call sites (`.map_err(from_backend_error)`).
use backend::BackendError;
use errors::StoreError;
use keyfn::InvalidKeyFnError;
use query::InvalidConditionError;

pub fn from_backend_error(collection: &str, e: BackendError) -> StoreError {
    match e {
        BackendError::NotFound(id, _) => StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        BackendError::IndexApply { index, reason } => StoreError::IndexApply { index, reason },
        BackendError::IndexTypeMismatch {
            index,
            existing,
            new,
        } => StoreError::IndexTypeMismatch {
            index,
            existing: existing.to_string(),
            new: new.to_string(),
        },
        BackendError::Other { source, retriable } => StoreError::backend(source, retriable),
    }
}

pub fn from_key_fn_error(name: &str, e: InvalidKeyFnError) -> StoreError {
    StoreError::InvalidKeyFn {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

pub fn from_condition_error(e: InvalidConditionError) -> StoreError {
    StoreError::InvalidCondition(e.to_string())
}
