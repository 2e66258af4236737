use common_money::{clamp_non_negative, line_subtotal, percent_discount};
use proptest::prelude::*;

proptest! {
    // Floor semantics: the discount never exceeds the exact fraction
    // and undershoots it by strictly less than one minor unit.
    #[test]
    fn percent_discount_floor_bounds(subtotal in 0i64..10_000_000, percent in 0i64..=100) {
        let d = percent_discount(subtotal, percent);
        prop_assert!(d * 100 <= subtotal * percent);
        prop_assert!((d + 1) * 100 > subtotal * percent);
    }

    #[test]
    fn percent_discount_never_exceeds_subtotal(subtotal in 0i64..10_000_000, percent in 0i64..=100) {
        prop_assert!(percent_discount(subtotal, percent) <= subtotal);
    }

    #[test]
    fn line_subtotal_non_negative(unit in 0i64..1_000_000, discount in 0i64..2_000_000, qty in 1i32..100) {
        prop_assert!(line_subtotal(unit, discount, qty) >= 0);
    }

    #[test]
    fn clamp_is_identity_on_non_negative(v in 0i64..i64::MAX) {
        prop_assert_eq!(clamp_non_negative(v), v);
    }
}
