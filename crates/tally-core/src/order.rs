//! # Order Materializer
//!
//! Turns a priced cart and a payment selection into an immutable [`Order`].
//!
//! ## Checkout Flow
//! ```text
//! Cart lines + DiscountRule + PaymentType
//!      │
//!      ▼
//! materialize() ← THIS MODULE
//!      │
//!      ├── empty?                    → EmptyCart
//!      ├── bad price / quantity?     → InvalidLineItem
//!      ├── payment not accepted?     → UnknownPaymentType
//!      │
//!      ▼
//! Order { status: Completed, total_amount: pricing::total(..) }
//!      │
//!      ▼
//! OrderStore::save (collaborator, not called from here)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::pricing;
use crate::types::{
    DiscountRule, LineItem, Order, OrderLine, OrderStatus, PaymentType, PaymentTypeSet,
};
use crate::validation::validate_required_id;

/// Who is selling, where, and to whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleContext {
    pub branch_id: String,
    pub cashier_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl SaleContext {
    pub fn new(branch_id: impl Into<String>, cashier_id: impl Into<String>) -> Self {
        SaleContext {
            branch_id: branch_id.into(),
            cashier_id: cashier_id.into(),
            customer_id: None,
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

/// Builds a completed order from cart lines.
///
/// `total_amount` equals [`pricing::total`] at this instant and is frozen.
/// Order and line ids are fresh UUID v4s; the store may replace the order id
/// on save.
pub fn materialize(
    lines: &[LineItem],
    rule: &DiscountRule,
    payment_type: PaymentType,
    ctx: &SaleContext,
    accepted: &PaymentTypeSet,
    now: DateTime<Utc>,
) -> CoreResult<Order> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let priced = pricing::price(lines, rule)?;

    if !accepted.accepts(&payment_type) {
        return Err(CoreError::UnknownPaymentType(payment_type.code().to_string()));
    }

    validate_required_id("branch_id", &ctx.branch_id)?;
    validate_required_id("cashier_id", &ctx.cashier_id)?;

    let order_lines = lines
        .iter()
        .map(|line| OrderLine {
            id: Uuid::new_v4().to_string(),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        })
        .collect();

    Ok(Order {
        id: Uuid::new_v4().to_string(),
        branch_id: ctx.branch_id.clone(),
        cashier_id: ctx.cashier_id.clone(),
        customer_id: ctx.customer_id.clone(),
        lines: order_lines,
        payment_type,
        status: OrderStatus::Completed,
        subtotal: priced.subtotal,
        discount: priced.discount,
        total_amount: priced.total,
        created_at: Some(now),
    })
}

/// [`materialize`] over a cart's current lines and discount.
pub fn materialize_cart(
    cart: &Cart,
    payment_type: PaymentType,
    ctx: &SaleContext,
    accepted: &PaymentTypeSet,
    now: DateTime<Utc>,
) -> CoreResult<Order> {
    materialize(cart.lines(), cart.discount(), payment_type, ctx, accepted, now)
}
