use common_money::{clamp_non_negative, line_subtotal, percent_discount};
use serde::Serialize;

/// Discount rule carried by a coupon template. Templates with a
/// discount_type the engine does not recognize decode to no rule at
/// all, which prices as a zero discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRule {
    Fixed(i64),
    Percent(i64),
}

impl CouponRule {
    pub fn from_template(discount_type: &str, amount: i64, value: i64) -> Option<Self> {
        match discount_type {
            "fixed" => Some(CouponRule::Fixed(amount)),
            "percent" => Some(CouponRule::Percent(value)),
            _ => None,
        }
    }

    pub fn discount(&self, subtotal: i64) -> i64 {
        match *self {
            CouponRule::Fixed(amount) => amount.max(0),
            CouponRule::Percent(value) => percent_discount(subtotal, value),
        }
    }
}

/// One priced line of the selection, snapshotted from a cart row.
#[derive(Debug, Clone, Copy)]
pub struct PriceLine {
    pub unit_price: i64,
    pub discount_price: i64,
    pub quantity: i32,
}

/// The fully computed price breakdown for a selection. Pure data; the
/// order writer persists it and the payment confirmer later recomputes
/// the authoritative total from the persisted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub subtotal: i64,
    pub coupon_discount: i64,
    pub point_applied: i64,
    pub total: i64,
}

/// Prices a selection. Points are capped three ways: by the requested
/// amount, by the caller's available balance, and by the cash still due
/// after the coupon discount. The cash cap lives here, server-side, so
/// the UI preview can only ever mirror it, never override it.
pub fn price(
    lines: &[PriceLine],
    coupon: Option<CouponRule>,
    requested_point: i64,
    balance: i64,
) -> Quote {
    let subtotal: i64 = lines
        .iter()
        .map(|line| line_subtotal(line.unit_price, line.discount_price, line.quantity))
        .sum();

    let coupon_discount = coupon.map(|rule| rule.discount(subtotal)).unwrap_or(0);

    let cash_due = clamp_non_negative(subtotal - coupon_discount);
    let point_applied = requested_point.max(0).min(balance.max(0)).min(cash_due);

    let total = clamp_non_negative(subtotal - coupon_discount - point_applied);

    Quote {
        subtotal,
        coupon_discount,
        point_applied,
        total,
    }
}
