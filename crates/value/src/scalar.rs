//! The canonical scalar value taxonomy (spec §3, §4.1).
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RecordId;

/// A finite `f64`: NaN is rejected at construction. Infinities are allowed
/// and order normally, so `Finite` is a total order over the values it can
/// hold (unlike bare `f64`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Finite(f64);

impl Finite {
    pub fn new(value: f64) -> Result<Self, NanError> {
        if value.is_nan() {
            return Err(NanError);
        }
        Ok(Finite(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("NaN is not a valid index value")]
pub struct NanError;

impl PartialEq for Finite {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for Finite {}
impl PartialOrd for Finite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Finite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The type tag of a [`Scalar`], i.e. the "supported index type set"
/// (spec §3) the facade exposes for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ScalarTag {
    Int,
    Float,
    Bool,
    Str,
    Id,
    Timestamp,
}

impl std::fmt::Display for ScalarTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScalarTag::Int => "int",
            ScalarTag::Float => "float",
            ScalarTag::Bool => "bool",
            ScalarTag::Str => "str",
            ScalarTag::Id => "id",
            ScalarTag::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// One of the six scalar value kinds an index may be keyed by (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Int(i64),
    Float(Finite),
    Bool(bool),
    Str(String),
    Id(RecordId),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    pub fn tag(&self) -> ScalarTag {
        match self {
            Scalar::Int(_) => ScalarTag::Int,
            Scalar::Float(_) => ScalarTag::Float,
            Scalar::Bool(_) => ScalarTag::Bool,
            Scalar::Str(_) => ScalarTag::Str,
            Scalar::Id(_) => ScalarTag::Id,
            Scalar::Timestamp(_) => ScalarTag::Timestamp,
        }
    }

    /// The total order defined in spec §4.1, raising rather than guessing
    /// when the two scalars don't share a type tag. Every caller that
    /// reaches the backend boundary has already checked tags match (an
    /// index's `value_type` pins every entry to one tag), so this is the
    /// only place that enforces it.
    pub fn checked_cmp(&self, other: &Scalar) -> Result<Ordering, CrossTypeError> {
        use Scalar::*;
        match (self, other) {
            (Int(a), Int(b)) => Ok(a.cmp(b)),
            (Float(a), Float(b)) => Ok(a.cmp(b)),
            (Bool(a), Bool(b)) => Ok(a.cmp(b)),
            (Str(a), Str(b)) => Ok(a.cmp(b)),
            (Id(a), Id(b)) => Ok(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Ok(a.cmp(b)),
            _ => Err(CrossTypeError {
                left: self.tag(),
                right: other.tag(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("cannot compare scalar of type {left} to scalar of type {right}")]
pub struct CrossTypeError {
    pub left: ScalarTag,
    pub right: ScalarTag,
}

/// `Ord`/`Eq` are required so `Scalar` values can live as `BTreeMap` keys
/// inside a single index's ordered multimap. Within one index every entry
/// shares a type tag (enforced by `IndexTypeMismatchError` at write time),
/// so in practice this total order never needs to compare across tags;
/// when it must (only possible if that invariant is ever violated), tags
/// are ordered first so the order stays total and deterministic.
impl Eq for Scalar {}
impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        self.checked_cmp(other)
            .unwrap_or_else(|_| self.tag().cmp(&other.tag()))
    }
}
