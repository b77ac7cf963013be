//! Canonical scalar/document value taxonomy shared by every other crate in
//! the workspace (spec §3, §4.1).

mod base32;
mod doc;
mod id;
mod scalar;

pub use doc::{DocValue, Document};
pub use id::{IdDecodeError, RecordId};
pub use scalar::{CrossTypeError, Finite, NanError, Scalar, ScalarTag};

/// The supported index type set (spec §3), exposed for introspection via
/// `Store::supported_index_types`.
pub const SUPPORTED_SCALAR_TAGS: &[ScalarTag] = &[
    ScalarTag::Int,
    ScalarTag::Float,
    ScalarTag::Bool,
    ScalarTag::Str,
    ScalarTag::Id,
    ScalarTag::Timestamp,
];

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn tag_ordering_is_a_total_order(a: ScalarTag, b: ScalarTag, c: ScalarTag) {
            // Antisymmetry and transitivity, spot-checked over the derived
            // `Ord` that `Scalar::cmp` falls back to for cross-tag pairs.
            if a == b {
                prop_assert_eq!(a.cmp(&b), Ordering::Equal);
            }
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }
    }

    #[test]
    fn same_tag_scalars_order_as_expected() {
        assert_eq!(
            Scalar::Int(1).checked_cmp(&Scalar::Int(2)),
            Ok(Ordering::Less)
        );
        assert_eq!(
            Scalar::Str("a".into()).checked_cmp(&Scalar::Str("b".into())),
            Ok(Ordering::Less)
        );
    }

    #[test]
    fn cross_tag_comparison_is_rejected() {
        let err = Scalar::Int(1)
            .checked_cmp(&Scalar::Str("1".into()))
            .unwrap_err();
        assert_eq!(err.left, ScalarTag::Int);
        assert_eq!(err.right, ScalarTag::Str);
    }

    #[test]
    fn nan_is_rejected() {
        assert!(Finite::new(f64::NAN).is_err());
        assert!(Finite::new(f64::INFINITY).is_ok());
    }
}
