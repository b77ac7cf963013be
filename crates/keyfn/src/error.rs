use thiserror::Error;

/// Raised while evaluating a `KeyFunction` against a document (spec §4.2:
/// "Errors during apply propagate as index-write failures").
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("field {0:?} is missing")]
    MissingField(String),
    #[error("field resolved to null")]
    Null,
    #[error("expected a {expected} value, found a {found} value")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("key function did not resolve to a scalar value")]
    NotScalar,
    #[error("floating point transform produced NaN")]
    Nan,
}

/// Raised by `KeyFunction::from_blob` and `test_key_fn` (spec §4.2,
/// §7: "key function fails to serialize/deserialize or round-trip").
#[derive(Debug, Error)]
pub enum InvalidKeyFnError {
    #[error("key function blob could not be deserialized: {0}")]
    Deserialize(#[from] bincode::Error),
    #[error(
        "key function did not round-trip: applying the original and the \
         deserialized copy to the sample document produced different results"
    )]
    RoundTripMismatch,
    #[error("key function could not be applied to the sample document: {0}")]
    SampleApply(#[from] ApplyError),
}
