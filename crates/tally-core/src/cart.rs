//! # Cart
//!
//! The cart-in-progress of one checkout session.
//!
//! A `Cart` is a plain value owned by its checkout session (one per
//! terminal), never ambient global state. Totals are not stored: every
//! read goes through [`pricing::price`], so no mutation can leave a stale
//! figure behind.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier Action           Cart Method             State Change          │
//! │  ──────────────           ───────────             ────────────          │
//! │                                                                         │
//! │  Scan product ──────────► add_item() ───────────► push or qty += n      │
//! │  Change quantity ───────► update_quantity() ────► qty = n (0 removes)   │
//! │  Remove line ───────────► remove_item() ────────► retain others         │
//! │  Apply coupon ──────────► set_discount() ───────► rule replaced         │
//! │  Clear ─────────────────► clear() ──────────────► empty, no discount    │
//! │  Show totals ───────────► totals() ─────────────► (full recompute)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, PricedCart};
use crate::types::{DiscountRule, LineItem};
use crate::validation::{
    validate_cart_size, validate_discount_bps, validate_price_cents, validate_quantity,
};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is within 1..=999
/// - At most 100 unique lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<LineItem>,
    discount: DiscountRule,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart opened at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Cart {
            lines: Vec::new(),
            discount: DiscountRule::None,
            created_at: now,
        }
    }

    /// Adds a product or increases its quantity if already present.
    ///
    /// The price captured on first add is kept for the life of the line.
    pub fn add_item(
        &mut self,
        product_id: &str,
        name: &str,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price_cents(unit_price.cents())?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.lines.len())
            .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_ITEMS })?;

        self.lines
            .push(LineItem::new(product_id, unit_price, quantity).named(name));
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotInCart(product_id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line by product id.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::ProductNotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Replaces the discount rule.
    pub fn set_discount(&mut self, rule: DiscountRule) -> CoreResult<()> {
        if let DiscountRule::Percentage { bps } = rule {
            validate_discount_bps(bps)?;
        }
        self.discount = rule;
        Ok(())
    }

    /// Empties the cart and drops the discount.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.lines.clear();
        self.discount = DiscountRule::None;
        self.created_at = now;
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn discount(&self) -> &DiscountRule {
        &self.discount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Recomputes subtotal, discount and total from the current lines.
    pub fn totals(&self) -> CoreResult<PricedCart> {
        pricing::price(&self.lines, &self.discount)
    }
}
