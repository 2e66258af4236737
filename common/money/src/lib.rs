// Monetary amounts are integer minor units (won/cents). All checkout
// arithmetic is exact i64; fractional results are floor-rounded at the
// point they are produced, never carried. Products of schema-valid but
// extreme inputs saturate instead of overflowing.

/// Subtotal for one line: (unit_price − discount_price) × quantity.
/// A discount_price above unit_price counts as a full markdown, not a
/// negative line.
pub fn line_subtotal(unit_price: i64, discount_price: i64, quantity: i32) -> i64 {
    let net = unit_price.saturating_sub(discount_price).max(0);
    net.saturating_mul(quantity as i64)
}

/// Percent discount on a subtotal, floor-rounded (15% of 10000 is
/// exactly 1500; 15% of 10001 is 1500, never 1501).
pub fn percent_discount(subtotal: i64, percent: i64) -> i64 {
    if subtotal <= 0 || percent <= 0 {
        return 0;
    }
    subtotal.saturating_mul(percent) / 100
}

/// Final totals never go below zero regardless of how deep discounts
/// and point redemption cut.
pub fn clamp_non_negative(value: i64) -> i64 {
    value.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_subtotal_nets_discount() {
        assert_eq!(line_subtotal(10_000, 0, 2), 20_000);
        assert_eq!(line_subtotal(10_000, 1_500, 3), 25_500);
    }

    #[test]
    fn line_subtotal_never_negative() {
        assert_eq!(line_subtotal(1_000, 2_000, 5), 0);
    }

    #[test]
    fn line_subtotal_saturates_on_extreme_prices() {
        assert_eq!(line_subtotal(i64::MAX, 0, 2), i64::MAX);
        assert_eq!(line_subtotal(i64::MAX, i64::MIN, 1), i64::MAX);
    }

    #[test]
    fn percent_discount_floors() {
        assert_eq!(percent_discount(10_000, 15), 1_500);
        assert_eq!(percent_discount(10_001, 15), 1_500);
        assert_eq!(percent_discount(999, 10), 99);
    }

    #[test]
    fn percent_discount_ignores_garbage() {
        assert_eq!(percent_discount(-500, 10), 0);
        assert_eq!(percent_discount(10_000, -5), 0);
    }

    #[test]
    fn percent_discount_saturates_on_extreme_subtotal() {
        assert_eq!(percent_discount(i64::MAX, 100), i64::MAX / 100);
    }

    #[test]
    fn clamp_floor_at_zero() {
        assert_eq!(clamp_non_negative(-300), 0);
        assert_eq!(clamp_non_negative(300), 300);
    }
}
