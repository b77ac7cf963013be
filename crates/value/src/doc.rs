//! Documents: recursive, schemaless JSON-like trees (spec §3).
use imbl::OrdMap;

use crate::scalar::Scalar;

/// A recursive mapping from text keys to values of type
/// `{scalar, document, ordered sequence of document/scalar}` (spec §3),
/// plus `Null` for "field present but empty" — JSON-like trees need a hole
/// for that, and it is exactly the value a key function must never resolve
/// to (spec §3 Invariants: "no record may be indexed to a null, missing,
/// or unordered value").
///
/// Backed by `imbl::OrdMap`, an immutable ordered map: the Condition DSL
/// and the facade hand out documents by value, and the teacher's codebase
/// leans on `imbl`'s structural sharing for exactly this "cheap clone,
/// immutable once built" shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Document(OrdMap<String, DocValue>);

impl Document {
    pub fn new() -> Self {
        Document(OrdMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&DocValue> {
        self.0.get(field)
    }

    /// Walk a dot-path of field names through nested documents, as used by
    /// `KeyExpr::Path` (spec §9's "chained field-pick").
    pub fn get_path(&self, path: &[String]) -> Option<&DocValue> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            Some(value)
        } else if let DocValue::Document(inner) = value {
            inner.get_path(rest)
        } else {
            None
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: DocValue) {
        self.0.insert(field.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DocValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(String, DocValue)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, DocValue)>>(iter: T) -> Self {
        Document(iter.into_iter().collect())
    }
}

/// One node of a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Scalar(Scalar),
    Document(Document),
    Array(Vec<DocValue>),
}

impl DocValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            DocValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }
}

impl From<Scalar> for DocValue {
    fn from(s: Scalar) -> Self {
        DocValue::Scalar(s)
    }
}
