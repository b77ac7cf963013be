//! The serializable key-function combinator language (spec §9:
//! "restrict key functions to a small, serializable combinator language").
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyExpr {
    /// `λd. d[field]` — the shorthand form (spec §3: "the shorthand form
    /// where the spec is given as a bare field name `f`").
    Field(String),
    /// Chained field-pick through nested documents.
    Path(Vec<String>),
    Lower(Box<KeyExpr>),
    Upper(Box<KeyExpr>),
    /// String character count, or array element count.
    Length(Box<KeyExpr>),
    Add(Box<KeyExpr>, OrderedF64),
    Sub(Box<KeyExpr>, OrderedF64),
    Mul(Box<KeyExpr>, OrderedF64),
}

/// `f64` isn't `Eq`, but key-function ASTs need to be (two `KeyFunction`s
/// are equal iff their blobs are byte-identical, which in turn requires
/// the AST to round-trip through `PartialEq` the way it round-trips
/// through serialization). Bit-pattern equality is exactly what blob
/// equality already gives us, so derive it explicitly rather than
/// comparing as floats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedF64(pub f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
