use keyfn::KeyFunction;

/// Declared (name, key function) pair (spec §3's `IndexSpec`; `value_type`
/// is omitted here because it is *derived*, not declared — it only exists
/// once an entry has made it into [`crate::SchemaState`]).
#[derive(Debug, Clone)]
pub struct IndexSpec {
    logical_name: String,
    key_fn: KeyFunction,
}

impl IndexSpec {
    pub fn new(logical_name: impl Into<String>, key_fn: KeyFunction) -> Self {
        IndexSpec {
            logical_name: logical_name.into(),
            key_fn,
        }
    }

    /// The shorthand where the spec is given as a bare field name `f`
    /// (spec §3: `Index(f, key_fn = λd. d[f])`).
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        IndexSpec {
            key_fn: KeyFunction::field(name.clone()),
            logical_name: name,
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn key_fn(&self) -> &KeyFunction {
        &self.key_fn
    }
}

/// Two `IndexSpec`s are equivalent iff their `logical_name` and the
/// serialized form of their `key_fn` are byte-equal (spec §3).
impl PartialEq for IndexSpec {
    fn eq(&self, other: &Self) -> bool {
        self.logical_name == other.logical_name && self.key_fn == other.key_fn
    }
}
impl Eq for IndexSpec {}
