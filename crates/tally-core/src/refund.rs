//! # Refund Reconciliation Engine
//!
//! Validates a return selection against an order and its refund history and
//! produces the [`Refund`] record to persist.
//!
//! ## Refund State Machine
//! ```text
//! ┌──────────┐  partial return  ┌───────────────────┐  last units   ┌────────────────┐
//! │ NoRefund │ ───────────────► │ PartiallyRefunded │ ────────────► │ FullyRefunded  │
//! └──────────┘                  └───────────────────┘               └────────────────┘
//!       │                                                                  ▲
//!       └──────────────────────── everything at once ─────────────────────┘
//!
//! Monotonic: a refund never moves an order back. FullyRefunded is terminal.
//! ```
//!
//! ## Pricing Rule
//! Refunds are computed from the ORIGINAL unit price of each returned line.
//! The order-level discount is not re-allocated across partial returns, so
//! the amount check (Σ refunds ≤ total_amount) can reject the last units of
//! a discounted order.
//!
//! ## Caller Precondition
//! `prior_refunds` must be a consistent snapshot of every refund already
//! stored for the order, and the caller must hold that snapshot until the new
//! refund is written (a per-order lock or a serializing transaction). Two
//! unserialized reconciliations against the same order can each pass the
//! ceiling checks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{RefundError, ReturnLimit};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Order, OrderStatus, PaymentType, Refund, RefundLine};

/// Where an order sits in its refund lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundState {
    NoRefund,
    PartiallyRefunded,
    FullyRefunded,
}

/// Units of one line the customer wants to give back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnSelection {
    pub line_item_id: String,
    pub return_qty: i64,
}

impl ReturnSelection {
    pub fn new(line_item_id: impl Into<String>, return_qty: i64) -> Self {
        ReturnSelection {
            line_item_id: line_item_id.into(),
            return_qty,
        }
    }
}

/// A refund as requested at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub order_id: String,
    pub selections: Vec<ReturnSelection>,
    pub reason: String,
    /// Defaults to the order's payment type when `None`.
    #[serde(default)]
    pub refund_payment_type: Option<PaymentType>,
    pub cashier_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub shift_report_id: Option<String>,
}

/// Sold, returned and remaining units for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnableLine {
    pub line_item_id: String,
    pub product_id: String,
    pub sold: Quantity,
    pub returned: Quantity,
    pub remaining: Quantity,
}

// =============================================================================
// History
// =============================================================================

fn refunds_for<'a>(order: &'a Order, refunds: &'a [Refund]) -> impl Iterator<Item = &'a Refund> {
    refunds.iter().filter(move |r| r.order_id == order.id)
}

/// Units already returned per line id, across this order's prior refunds.
fn returned_by_line(order: &Order, prior_refunds: &[Refund]) -> HashMap<String, Quantity> {
    let mut returned: HashMap<String, Quantity> = HashMap::new();
    for line in refunds_for(order, prior_refunds).flat_map(|r| r.lines.iter()) {
        let entry = returned.entry(line.line_item_id.clone()).or_default();
        *entry = entry.saturating_add(line.quantity);
    }
    returned
}

/// Per-line remaining returnable quantity.
///
/// Refunds for other orders in `prior_refunds` are ignored.
pub fn remaining_returnable(order: &Order, prior_refunds: &[Refund]) -> Vec<ReturnableLine> {
    let returned = returned_by_line(order, prior_refunds);
    order
        .lines
        .iter()
        .map(|line| {
            let sold = Quantity::new(line.quantity).unwrap_or_default();
            let done = returned.get(&line.id).copied().unwrap_or_default();
            ReturnableLine {
                line_item_id: line.id.clone(),
                product_id: line.product_id.clone(),
                sold,
                returned: done,
                remaining: sold.saturating_sub(done),
            }
        })
        .collect()
}

/// Σ amount of this order's prior refunds.
pub fn refunded_amount(order: &Order, prior_refunds: &[Refund]) -> Money {
    refunds_for(order, prior_refunds).map(|r| r.amount).sum()
}

/// `total_amount − refunded`, never negative.
pub fn refundable_balance(order: &Order, prior_refunds: &[Refund]) -> Money {
    (order.total_amount - refunded_amount(order, prior_refunds)).floor_zero()
}

/// Derives the refund state from history.
pub fn refund_state(order: &Order, prior_refunds: &[Refund]) -> RefundState {
    if refunds_for(order, prior_refunds).next().is_none() {
        return RefundState::NoRefund;
    }

    let remaining = remaining_returnable(order, prior_refunds);
    let all_units_back = !remaining.is_empty() && remaining.iter().all(|l| l.remaining.is_zero());
    let all_money_back = order.total_amount.is_positive()
        && refunded_amount(order, prior_refunds) >= order.total_amount;

    if all_units_back || all_money_back {
        RefundState::FullyRefunded
    } else {
        RefundState::PartiallyRefunded
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Validates a refund request and builds the refund record.
///
/// ## Checks (in order)
/// 1. `OrderNotFound`, `OrderNotRefundable`, `AlreadyFullyRefunded`
/// 2. `EmptySelection`, `LineItemNotFound`
/// 3. `OverReturn` on a line's remaining units, then on the order's balance
/// 4. `MissingReason`, `MissingRefundMethod`
///
/// Selections with `return_qty <= 0` are ignored; repeated line ids are
/// summed.
pub fn reconcile(
    order: Option<&Order>,
    request: &RefundRequest,
    prior_refunds: &[Refund],
    now: DateTime<Utc>,
) -> Result<Refund, RefundError> {
    let order = order
        .filter(|o| o.id == request.order_id)
        .ok_or_else(|| RefundError::OrderNotFound(request.order_id.clone()))?;

    if order.status == OrderStatus::Cancelled {
        return Err(RefundError::OrderNotRefundable {
            order_id: order.id.clone(),
            status: order.status.to_string(),
        });
    }
    if refund_state(order, prior_refunds) == RefundState::FullyRefunded {
        return Err(RefundError::AlreadyFullyRefunded(order.id.clone()));
    }

    // Positive selections merged per line, in first-seen order
    let mut wanted: Vec<(String, Quantity)> = Vec::new();
    for sel in &request.selections {
        let Some(qty) = Quantity::new(sel.return_qty).ok().filter(|q| !q.is_zero()) else {
            continue;
        };
        match wanted.iter_mut().find(|(id, _)| *id == sel.line_item_id) {
            Some((_, total)) => *total = total.saturating_add(qty),
            None => wanted.push((sel.line_item_id.clone(), qty)),
        }
    }
    if wanted.is_empty() {
        return Err(RefundError::EmptySelection);
    }

    let remaining = remaining_returnable(order, prior_refunds);
    let mut lines = Vec::with_capacity(wanted.len());
    for (line_item_id, qty) in wanted {
        let line = order
            .line(&line_item_id)
            .ok_or_else(|| RefundError::LineItemNotFound(line_item_id.clone()))?;
        let left = remaining
            .iter()
            .find(|r| r.line_item_id == line_item_id)
            .map(|r| r.remaining)
            .unwrap_or_default();
        if qty > left {
            return Err(RefundError::OverReturn(ReturnLimit::Quantity {
                line_item_id,
                requested: qty.get(),
                remaining: left.get(),
            }));
        }
        lines.push(RefundLine {
            line_item_id,
            product_id: line.product_id.clone(),
            quantity: qty,
            amount: line.unit_price.times(qty.get()),
        });
    }

    let amount: Money = lines.iter().map(|l| l.amount).sum();
    let balance = refundable_balance(order, prior_refunds);
    if amount > balance {
        return Err(RefundError::OverReturn(ReturnLimit::Amount {
            requested: amount,
            remaining: balance,
        }));
    }

    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(RefundError::MissingReason);
    }
    let payment_type = request
        .refund_payment_type
        .clone()
        .unwrap_or_else(|| order.payment_type.clone());
    if payment_type.is_blank() {
        return Err(RefundError::MissingRefundMethod);
    }

    Ok(Refund {
        id: Uuid::new_v4().to_string(),
        order_id: order.id.clone(),
        reason: reason.to_string(),
        amount,
        payment_type,
        cashier_id: request.cashier_id.clone(),
        branch_id: request.branch_id.clone(),
        shift_report_id: request.shift_report_id.clone(),
        lines,
        created_at: Some(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderLine;

    /// Order of 225: line-1 is 2 @ 100, line-2 is 1 @ 50, 10% off.
    fn order() -> Order {
        Order {
            id: "order-1".into(),
            branch_id: "branch-1".into(),
            cashier_id: "cashier-1".into(),
            customer_id: None,
            lines: vec![
                OrderLine {
                    id: "line-1".into(),
                    product_id: "shirt".into(),
                    name: "Shirt".into(),
                    unit_price: Money::from_major(100),
                    quantity: 2,
                    line_total: Money::from_major(200),
                },
                OrderLine {
                    id: "line-2".into(),
                    product_id: "socks".into(),
                    name: "Socks".into(),
                    unit_price: Money::from_major(50),
                    quantity: 1,
                    line_total: Money::from_major(50),
                },
            ],
            payment_type: PaymentType::card(),
            status: OrderStatus::Completed,
            subtotal: Money::from_major(250),
            discount: Money::from_major(25),
            total_amount: Money::from_major(225),
            created_at: Some(Utc::now()),
        }
    }

    fn request(selections: Vec<ReturnSelection>) -> RefundRequest {
        RefundRequest {
            order_id: "order-1".into(),
            selections,
            reason: "damaged".into(),
            refund_payment_type: None,
            cashier_id: "cashier-2".into(),
            branch_id: "branch-1".into(),
            shift_report_id: None,
        }
    }

    fn one(line: &str, qty: i64) -> RefundRequest {
        request(vec![ReturnSelection::new(line, qty)])
    }

    #[test]
    fn test_partial_refund_then_over_return() {
        let order = order();
        let first = reconcile(Some(&order), &one("line-1", 1), &[], Utc::now()).unwrap();
        assert_eq!(first.amount, Money::from_major(100));
        assert_eq!(first.payment_type, PaymentType::card());
        assert_eq!(refund_state(&order, &[first.clone()]), RefundState::PartiallyRefunded);

        let err = reconcile(Some(&order), &one("line-1", 2), &[first], Utc::now()).unwrap_err();
        assert_eq!(
            err,
            RefundError::OverReturn(ReturnLimit::Quantity {
                line_item_id: "line-1".into(),
                requested: 2,
                remaining: 1,
            })
        );
    }

    #[test]
    fn test_amount_ceiling_uses_undiscounted_prices() {
        let order = order();
        let first = reconcile(Some(&order), &one("line-1", 2), &[], Utc::now()).unwrap();
        let history = vec![first];
        assert_eq!(refundable_balance(&order, &history), Money::from_major(25));

        // 50 at original price > 25 left on the order
        let err = reconcile(Some(&order), &one("line-2", 1), &history, Utc::now()).unwrap_err();
        assert!(matches!(err, RefundError::OverReturn(ReturnLimit::Amount { .. })));

        let total: Money = history.iter().map(|r| r.amount).sum();
        assert!(total <= order.total_amount);
    }

    #[test]
    fn test_fully_refunded_is_terminal() {
        let mut order = order();
        order.discount = Money::zero();
        order.total_amount = Money::from_major(250);

        let all = request(vec![
            ReturnSelection::new("line-1", 2),
            ReturnSelection::new("line-2", 1),
        ]);
        let refund = reconcile(Some(&order), &all, &[], Utc::now()).unwrap();
        assert_eq!(refund.amount, Money::from_major(250));

        let history = vec![refund];
        assert_eq!(refund_state(&order, &history), RefundState::FullyRefunded);
        assert_eq!(
            reconcile(Some(&order), &one("line-2", 1), &history, Utc::now()).unwrap_err(),
            RefundError::AlreadyFullyRefunded("order-1".into())
        );
    }

    #[test]
    fn test_per_line_ceiling_holds_across_many_refunds() {
        let mut order = order();
        order.total_amount = Money::from_major(250);
        let mut history = Vec::new();
        for _ in 0..5 {
            let attempt = reconcile(Some(&order), &one("line-1", 1), &history, Utc::now());
            if let Ok(r) = attempt {
                history.push(r);
            }
        }
        let returned: i64 = history
            .iter()
            .flat_map(|r| r.lines.iter())
            .filter(|l| l.line_item_id == "line-1")
            .map(|l| l.quantity.get())
            .sum();
        assert_eq!(returned, 2);
    }

    #[test]
    fn test_validation_order() {
        let order = order();

        assert_eq!(
            reconcile(None, &one("line-1", 1), &[], Utc::now()).unwrap_err(),
            RefundError::OrderNotFound("order-1".into())
        );

        let mut other = one("line-1", 1);
        other.order_id = "order-2".into();
        assert!(matches!(
            reconcile(Some(&order), &other, &[], Utc::now()),
            Err(RefundError::OrderNotFound(_))
        ));

        // Empty selection wins over a missing reason
        let mut empty = request(vec![ReturnSelection::new("line-1", 0)]);
        empty.reason = "  ".into();
        assert_eq!(
            reconcile(Some(&order), &empty, &[], Utc::now()).unwrap_err(),
            RefundError::EmptySelection
        );
        assert_eq!(
            reconcile(Some(&order), &request(vec![]), &[], Utc::now()).unwrap_err(),
            RefundError::EmptySelection
        );

        assert_eq!(
            reconcile(Some(&order), &one("line-9", 1), &[], Utc::now()).unwrap_err(),
            RefundError::LineItemNotFound("line-9".into())
        );

        // Over-return wins over a missing reason
        let mut over = one("line-2", 2);
        over.reason = String::new();
        assert!(matches!(
            reconcile(Some(&order), &over, &[], Utc::now()),
            Err(RefundError::OverReturn(_))
        ));

        let mut no_reason = one("line-2", 1);
        no_reason.reason = "\t".into();
        assert_eq!(
            reconcile(Some(&order), &no_reason, &[], Utc::now()).unwrap_err(),
            RefundError::MissingReason
        );

        let mut no_method = one("line-2", 1);
        no_method.refund_payment_type = Some(PaymentType::new(""));
        assert_eq!(
            reconcile(Some(&order), &no_method, &[], Utc::now()).unwrap_err(),
            RefundError::MissingRefundMethod
        );
    }

    #[test]
    fn test_cancelled_order_not_refundable() {
        let mut order = order();
        order.status = OrderStatus::Cancelled;
        assert!(matches!(
            reconcile(Some(&order), &one("line-1", 1), &[], Utc::now()),
            Err(RefundError::OrderNotRefundable { .. })
        ));
    }

    #[test]
    fn test_selections_merge_and_ignore_non_positive() {
        let order = order();
        let req = request(vec![
            ReturnSelection::new("line-1", 1),
            ReturnSelection::new("line-2", -4),
            ReturnSelection::new("line-1", 1),
        ]);
        let refund = reconcile(Some(&order), &req, &[], Utc::now()).unwrap();
        assert_eq!(refund.lines.len(), 1);
        assert_eq!(refund.lines[0].quantity.get(), 2);
        assert_eq!(refund.amount, Money::from_major(200));
    }

    #[test]
    fn test_huge_merged_selections_hit_the_quantity_ceiling() {
        let order = order();
        let req = request(vec![
            ReturnSelection::new("line-1", i64::MAX),
            ReturnSelection::new("line-1", 1),
        ]);
        let err = reconcile(Some(&order), &req, &[], Utc::now()).unwrap_err();
        assert_eq!(
            err,
            RefundError::OverReturn(ReturnLimit::Quantity {
                line_item_id: "line-1".into(),
                requested: i64::MAX,
                remaining: 2,
            })
        );

        // The line's ceiling is intact afterwards
        let refund = reconcile(Some(&order), &one("line-1", 2), &[], Utc::now()).unwrap();
        assert!(refund.lines.iter().all(|l| l.quantity.get() == 2));
    }

    #[test]
    fn test_huge_unit_price_cannot_slip_under_the_amount_ceiling() {
        let mut order = order();
        order.lines[0].unit_price = Money::from_cents(i64::MAX / 2);
        order.lines[0].quantity = 3;
        let err = reconcile(Some(&order), &one("line-1", 3), &[], Utc::now()).unwrap_err();
        assert!(matches!(err, RefundError::OverReturn(ReturnLimit::Amount { .. })));
    }

    #[test]
    fn test_refund_method_override_and_record_fields() {
        let order = order();
        let mut req = one("line-2", 1);
        req.refund_payment_type = Some(PaymentType::cash());
        req.shift_report_id = Some("shift-7".into());
        req.reason = "  wrong size ".into();

        let now = Utc::now();
        let refund = reconcile(Some(&order), &req, &[], now).unwrap();
        assert_eq!(refund.payment_type, PaymentType::cash());
        assert_eq!(refund.reason, "wrong size");
        assert_eq!(refund.shift_report_id.as_deref(), Some("shift-7"));
        assert_eq!(refund.cashier_id, "cashier-2");
        assert_eq!(refund.created_at, Some(now));
        assert_eq!(refund.lines[0].product_id, "socks");
    }

    #[test]
    fn test_history_for_other_orders_is_ignored() {
        let order = order();
        let mut foreign = reconcile(Some(&order), &one("line-1", 2), &[], Utc::now()).unwrap();
        foreign.order_id = "order-99".into();

        let history = vec![foreign];
        assert_eq!(refund_state(&order, &history), RefundState::NoRefund);
        let remaining = remaining_returnable(&order, &history);
        assert_eq!(remaining[0].remaining.get(), 2);
        assert!(reconcile(Some(&order), &one("line-1", 2), &history, Utc::now()).is_ok());
    }
}
