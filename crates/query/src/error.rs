use thiserror::Error;
use value::ScalarTag;

/// A malformed `Condition`: cross-type comparison (handle compared to a
/// non-scalar literal, in languages where that's representable, or to a
/// scalar of the wrong type tag here), or handle-to-handle comparison
/// (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConditionError {
    #[error(
        "index {index:?} holds {index_type} values, but was compared to a {literal_type} literal"
    )]
    CrossType {
        index: String,
        index_type: ScalarTag,
        literal_type: ScalarTag,
    },
}
