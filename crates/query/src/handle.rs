//! Handles: opaque references to an index of a given collection, the only
//! thing the Condition DSL can compare against a literal (spec §4.3).
use value::{Scalar, ScalarTag};

use crate::condition::Condition;
use crate::error::InvalidConditionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    collection: String,
    index_name: String,
    value_type: ScalarTag,
}

impl Handle {
    pub fn new(
        collection: impl Into<String>,
        index_name: impl Into<String>,
        value_type: ScalarTag,
    ) -> Self {
        Handle {
            collection: collection.into(),
            index_name: index_name.into(),
            value_type,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn value_type(&self) -> ScalarTag {
        self.value_type
    }

    /// Rust's comparison operators (`PartialOrd`/`PartialEq`) are fixed to
    /// return `bool`, so the ergonomic operator form described in spec §9
    /// isn't available here (see DESIGN.md); these explicit methods are
    /// the documented Rust-specific stand-in. Each one checks the
    /// literal's type tag against the handle's declared `value_type`
    /// before producing a `Condition` — this is what makes "handle
    /// compared to a value of the wrong type" a structural error instead
    /// of a query that silently returns nothing.
    pub fn eq(&self, value: Scalar) -> Result<Condition, InvalidConditionError> {
        self.checked(value, Condition::Eq)
    }

    pub fn lt(&self, value: Scalar) -> Result<Condition, InvalidConditionError> {
        self.checked(value, Condition::Lt)
    }

    pub fn le(&self, value: Scalar) -> Result<Condition, InvalidConditionError> {
        self.checked(value, Condition::Le)
    }

    pub fn gt(&self, value: Scalar) -> Result<Condition, InvalidConditionError> {
        self.checked(value, Condition::Gt)
    }

    pub fn ge(&self, value: Scalar) -> Result<Condition, InvalidConditionError> {
        self.checked(value, Condition::Ge)
    }

    fn checked(
        &self,
        value: Scalar,
        make: impl FnOnce(Handle, Scalar) -> Condition,
    ) -> Result<Condition, InvalidConditionError> {
        if value.tag() != self.value_type {
            return Err(InvalidConditionError::CrossType {
                index: self.index_name.clone(),
                index_type: self.value_type,
                literal_type: value.tag(),
            });
        }
        Ok(make(self.clone(), value))
    }
}
