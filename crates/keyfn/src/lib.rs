//! Derived-index functions: definition, serialization, deserialization,
//! invocation, and equality (spec §4.2).
mod error;
mod expr;

use value::{DocValue, Document, Finite, Scalar};

pub use crate::error::{ApplyError, InvalidKeyFnError};
use crate::expr::{KeyExpr, OrderedF64};

/// A pure, serializable mapping from document to scalar value, used to
/// derive an index entry (spec §4.2).
///
/// `PartialEq`/`Eq` compare serialized blobs, not ASTs, per spec: "Two
/// KeyFunctions are equal iff their serialized blobs are byte-identical."
/// The blob is computed once at construction time so equality checks never
/// re-serialize.
#[derive(Debug, Clone)]
pub struct KeyFunction {
    expr: KeyExpr,
    blob: Vec<u8>,
}

impl PartialEq for KeyFunction {
    fn eq(&self, other: &Self) -> bool {
        self.blob == other.blob
    }
}
impl Eq for KeyFunction {}

impl KeyFunction {
    fn from_expr(expr: KeyExpr) -> Self {
        let blob =
            bincode::serialize(&expr).expect("key-function combinator AST is always serializable");
        KeyFunction { expr, blob }
    }

    /// The `Index(f, key_fn = λd. d[f])` shorthand (spec §3).
    pub fn field(name: impl Into<String>) -> Self {
        Self::from_expr(KeyExpr::Field(name.into()))
    }

    /// Chained field-pick through nested documents.
    pub fn path<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_expr(KeyExpr::Path(names.into_iter().map(Into::into).collect()))
    }

    pub fn lower(self) -> Self {
        Self::from_expr(KeyExpr::Lower(Box::new(self.expr)))
    }

    pub fn upper(self) -> Self {
        Self::from_expr(KeyExpr::Upper(Box::new(self.expr)))
    }

    pub fn len(self) -> Self {
        Self::from_expr(KeyExpr::Length(Box::new(self.expr)))
    }

    pub fn add(self, n: f64) -> Self {
        Self::from_expr(KeyExpr::Add(Box::new(self.expr), OrderedF64(n)))
    }

    pub fn sub(self, n: f64) -> Self {
        Self::from_expr(KeyExpr::Sub(Box::new(self.expr), OrderedF64(n)))
    }

    pub fn mul(self, n: f64) -> Self {
        Self::from_expr(KeyExpr::Mul(Box::new(self.expr), OrderedF64(n)))
    }

    /// The self-contained byte blob sufficient to reconstruct an
    /// equivalent function in another process running the same image
    /// (spec §4.2).
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, InvalidKeyFnError> {
        let expr: KeyExpr = bincode::deserialize(blob)?;
        Ok(KeyFunction {
            expr,
            blob: blob.to_vec(),
        })
    }

    /// `apply(doc) -> value | error` (spec §4.2). Deterministic and side
    /// effect free.
    pub fn apply(&self, doc: &Document) -> Result<Scalar, ApplyError> {
        match eval(&self.expr, doc)? {
            DocValue::Scalar(s) => Ok(s),
            _ => Err(ApplyError::NotScalar),
        }
    }
}

fn eval(expr: &KeyExpr, doc: &Document) -> Result<DocValue, ApplyError> {
    match expr {
        KeyExpr::Field(name) => doc
            .get(name)
            .cloned()
            .ok_or_else(|| ApplyError::MissingField(name.clone())),
        KeyExpr::Path(path) => doc
            .get_path(path)
            .cloned()
            .ok_or_else(|| ApplyError::MissingField(path.join("."))),
        KeyExpr::Lower(inner) => match eval(inner, doc)? {
            DocValue::Scalar(Scalar::Str(s)) => Ok(DocValue::Scalar(Scalar::Str(s.to_lowercase()))),
            DocValue::Null => Err(ApplyError::Null),
            other => Err(ApplyError::WrongType {
                expected: "str",
                found: type_name(&other),
            }),
        },
        KeyExpr::Upper(inner) => match eval(inner, doc)? {
            DocValue::Scalar(Scalar::Str(s)) => Ok(DocValue::Scalar(Scalar::Str(s.to_uppercase()))),
            DocValue::Null => Err(ApplyError::Null),
            other => Err(ApplyError::WrongType {
                expected: "str",
                found: type_name(&other),
            }),
        },
        KeyExpr::Length(inner) => match eval(inner, doc)? {
            DocValue::Scalar(Scalar::Str(s)) => {
                Ok(DocValue::Scalar(Scalar::Int(s.chars().count() as i64)))
            },
            DocValue::Array(a) => Ok(DocValue::Scalar(Scalar::Int(a.len() as i64))),
            DocValue::Null => Err(ApplyError::Null),
            other => Err(ApplyError::WrongType {
                expected: "str or array",
                found: type_name(&other),
            }),
        },
        KeyExpr::Add(inner, n) => arithmetic(inner, doc, |v| v + n.0),
        KeyExpr::Sub(inner, n) => arithmetic(inner, doc, |v| v - n.0),
        KeyExpr::Mul(inner, n) => arithmetic(inner, doc, |v| v * n.0),
    }
}

fn arithmetic(
    inner: &KeyExpr,
    doc: &Document,
    transform: impl FnOnce(f64) -> f64,
) -> Result<DocValue, ApplyError> {
    let v = match eval(inner, doc)? {
        DocValue::Scalar(Scalar::Int(i)) => i as f64,
        DocValue::Scalar(Scalar::Float(f)) => f.get(),
        DocValue::Null => return Err(ApplyError::Null),
        other => {
            return Err(ApplyError::WrongType {
                expected: "int or float",
                found: type_name(&other),
            })
        },
    };
    let result = transform(v);
    let finite = Finite::new(result).map_err(|_| ApplyError::Nan)?;
    Ok(DocValue::Scalar(Scalar::Float(finite)))
}

fn type_name(v: &DocValue) -> &'static str {
    match v {
        DocValue::Null => "null",
        DocValue::Scalar(s) => match s {
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Str(_) => "str",
            Scalar::Id(_) => "id",
            Scalar::Timestamp(_) => "timestamp",
        },
        DocValue::Document(_) => "document",
        DocValue::Array(_) => "array",
    }
}

/// Round-trips `kf` through `(serialize, deserialize)` and reapplies it to
/// `sample_doc`, comparing outputs (spec §4.2). Returns the deserialized
/// copy on success, so callers can adopt it as "the" `KeyFunction` the way
/// a process would after loading one back out of persisted metadata.
pub fn test_key_fn(
    kf: &KeyFunction,
    sample_doc: &Document,
) -> Result<KeyFunction, InvalidKeyFnError> {
    let original_result = kf.apply(sample_doc)?;
    let round_tripped = KeyFunction::from_blob(kf.blob())?;
    let round_tripped_result = round_tripped.apply(sample_doc)?;
    if original_result != round_tripped_result || kf.blob != round_tripped.blob {
        return Err(InvalidKeyFnError::RoundTripMismatch);
    }
    Ok(round_tripped)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use value::DocValue as DV;

    use super::*;

    proptest! {
        #[test]
        fn field_key_fns_round_trip_through_their_blob(name in "[a-zA-Z_][a-zA-Z0-9_]{0,15}") {
            let kf = KeyFunction::field(&name);
            let restored = KeyFunction::from_blob(kf.blob()).unwrap();
            prop_assert_eq!(kf, restored);
        }

        #[test]
        fn lower_of_field_applies_the_same_to_any_ascii_string(
            name in "[a-zA-Z_][a-zA-Z0-9_]{0,15}",
            value in "[ -~]{0,32}",
        ) {
            let kf = KeyFunction::field(&name).lower();
            let mut doc = Document::new();
            doc.insert(name, DV::Scalar(Scalar::Str(value.clone())));
            let result = kf.apply(&doc).unwrap();
            prop_assert_eq!(result, Scalar::Str(value.to_lowercase()));
        }
    }

    fn doc_with(field: &str, value: DV) -> Document {
        let mut d = Document::new();
        d.insert(field, value);
        d
    }

    #[test]
    fn field_shorthand_applies() {
        let kf = KeyFunction::field("age");
        let doc = doc_with("age", DV::Scalar(Scalar::Int(31)));
        assert_eq!(kf.apply(&doc).unwrap(), Scalar::Int(31));
    }

    #[test]
    fn missing_field_is_apply_error() {
        let kf = KeyFunction::field("age");
        let doc = Document::new();
        assert_eq!(kf.apply(&doc), Err(ApplyError::MissingField("age".into())));
    }

    #[test]
    fn lower_transform_applies_to_strings() {
        let kf = KeyFunction::field("email").lower();
        let doc = doc_with("email", DV::Scalar(Scalar::Str("ABC@X".into())));
        assert_eq!(kf.apply(&doc).unwrap(), Scalar::Str("abc@x".into()));
    }

    #[test]
    fn equality_is_blob_equality() {
        let a = KeyFunction::field("age");
        let b = KeyFunction::field("age");
        let c = KeyFunction::field("height");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_fn_round_trips() {
        let kf = KeyFunction::field("email").lower();
        let doc = doc_with("email", DV::Scalar(Scalar::Str("ABC@X".into())));
        let round_tripped = test_key_fn(&kf, &doc).unwrap();
        assert_eq!(kf, round_tripped);
    }
}
