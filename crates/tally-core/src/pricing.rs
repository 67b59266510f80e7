//! # Cart Pricing Engine
//!
//! Subtotal, discount and total for a sale in progress.
//!
//! ## Full Recompute
//! ```text
//! add / remove / change quantity
//!      │
//!      ▼
//! price(lines, rule) ← recomputed from scratch every time, never a delta
//!      │
//!      ├── subtotal  = Σ unit_price × quantity
//!      ├── discount  = rule applied to subtotal, clamped to [0, subtotal]
//!      └── total     = subtotal − discount, floored at 0
//! ```
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::pricing;
//! use tally_core::types::{DiscountRule, LineItem};
//!
//! let lines = vec![
//!     LineItem::new("p-1", Money::from_major(100), 2),
//!     LineItem::new("p-2", Money::from_major(50), 1),
//! ];
//! let priced = pricing::price(&lines, &DiscountRule::percent(10)).unwrap();
//! assert_eq!(priced.subtotal, Money::from_major(250));
//! assert_eq!(priced.discount, Money::from_major(25));
//! assert_eq!(priced.total, Money::from_major(225));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, BPS_SCALE};
use crate::types::{DiscountRule, LineItem};

/// Totals for a priced cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedCart {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub item_count: usize,
    pub total_quantity: i64,
}

const OVERFLOW: &str = "line total exceeds the largest representable amount";

/// Checks one line (non-negative price, quantity of at least one) and
/// returns its exact total.
fn check_line(line: &LineItem) -> CoreResult<Money> {
    if line.unit_price.is_negative() {
        return Err(CoreError::invalid_line(
            &line.product_id,
            "unit price cannot be negative",
        ));
    }
    if line.quantity < 1 {
        return Err(CoreError::invalid_line(
            &line.product_id,
            "quantity must be at least 1",
        ));
    }
    line.unit_price
        .checked_times(line.quantity)
        .ok_or_else(|| CoreError::invalid_line(&line.product_id, OVERFLOW))
}


/// Σ `unit_price × quantity` over all lines.
///
/// Lines sharing a product id are summed as they are. A subtotal that does
/// not fit in `Money` is rejected against the line that overflowed it.
pub fn subtotal(lines: &[LineItem]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(check_line(line)?)
            .ok_or_else(|| CoreError::invalid_line(&line.product_id, OVERFLOW))
    })
}

/// The amount a rule takes off `subtotal`, always within `[0, subtotal]`.
pub fn discount_amount(subtotal: Money, rule: &DiscountRule) -> Money {
    let ceiling = subtotal.floor_zero();
    let raw = match *rule {
        DiscountRule::None => Money::zero(),
        DiscountRule::Percentage { bps } => ceiling.percentage_of(bps.min(BPS_SCALE)),
        DiscountRule::FixedAmount { amount } => amount,
    };
    raw.clamp_between(Money::zero(), ceiling)
}

/// `subtotal − discount`, never negative.
pub fn total(lines: &[LineItem], rule: &DiscountRule) -> CoreResult<Money> {
    let subtotal = subtotal(lines)?;
    Ok((subtotal - discount_amount(subtotal, rule)).floor_zero())
}

/// Prices a whole cart in one pass.
pub fn price(lines: &[LineItem], rule: &DiscountRule) -> CoreResult<PricedCart> {
    let subtotal = subtotal(lines)?;
    let discount = discount_amount(subtotal, rule);
    Ok(PricedCart {
        subtotal,
        discount,
        total: (subtotal - discount).floor_zero(),
        item_count: lines.len(),
        total_quantity: lines
            .iter()
            .fold(0_i64, |acc, l| acc.saturating_add(l.quantity)),
    })
}
