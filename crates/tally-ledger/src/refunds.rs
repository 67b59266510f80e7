//! # Refund Desk
//!
//! Issues refunds with the check-then-write step serialized per order.
//!
//! ## Why Per-Order Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Terminal A                         Terminal B                          │
//! │  ──────────                         ──────────                          │
//! │  lock(order-1) ✓                    lock(order-1) … waits               │
//! │  read prior refunds                                                     │
//! │  reconcile()  → 1 of 2 returnable                                       │
//! │  save refund                                                            │
//! │  unlock ───────────────────────────► lock(order-1) ✓                    │
//! │                                     read prior refunds (sees A's)       │
//! │                                     reconcile()  → OverReturn           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Refunds against different orders never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use tally_core::refund::{self, RefundRequest, RefundState, ReturnableLine};
use tally_core::{Order, Refund};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{OrderStore, RefundStore};

pub struct RefundDesk {
    orders: Arc<dyn OrderStore>,
    refunds: Arc<dyn RefundStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RefundDesk {
    pub fn new(orders: Arc<dyn OrderStore>, refunds: Arc<dyn RefundStore>) -> Self {
        RefundDesk {
            orders,
            refunds,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn order_lock(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(order_id.to_string())
            .or_default()
            .clone()
    }

    async fn load_order(&self, order_id: &str) -> LedgerResult<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Order", order_id))
    }

    /// Issues a refund at the current time.
    pub async fn issue(&self, request: &RefundRequest) -> LedgerResult<Refund> {
        self.issue_at(request, Utc::now()).await
    }

    /// Reconciles and stores a refund while holding the order's lock.
    pub async fn issue_at(
        &self,
        request: &RefundRequest,
        now: DateTime<Utc>,
    ) -> LedgerResult<Refund> {
        let lock = self.order_lock(&request.order_id).await;
        let _guard = lock.lock().await;

        let order = self.orders.get(&request.order_id).await?;
        let prior = self.refunds.for_order(&request.order_id).await?;

        let refund = match refund::reconcile(order.as_ref(), request, &prior, now) {
            Ok(refund) => refund,
            Err(e) => {
                warn!(order_id = %request.order_id, error = %e, "Refund rejected");
                return Err(e.into());
            }
        };
        let refund = self.refunds.save(refund).await?;

        info!(
            refund_id = %refund.id,
            order_id = %refund.order_id,
            amount = %refund.amount,
            method = %refund.payment_type,
            lines = refund.lines.len(),
            "Refund issued"
        );
        Ok(refund)
    }

    /// Remaining returnable units per line of an order.
    pub async fn returnable(&self, order_id: &str) -> LedgerResult<Vec<ReturnableLine>> {
        let order = self.load_order(order_id).await?;
        let prior = self.refunds.for_order(order_id).await?;
        Ok(refund::remaining_returnable(&order, &prior))
    }

    pub async fn state(&self, order_id: &str) -> LedgerResult<RefundState> {
        let order = self.load_order(order_id).await?;
        let prior = self.refunds.for_order(order_id).await?;
        Ok(refund::refund_state(&order, &prior))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryOrderStore, InMemoryRefundStore};
    use tally_core::refund::ReturnSelection;
    use tally_core::{Money, OrderLine, OrderStatus, PaymentType, RefundError, ReturnLimit};

    async fn desk_with_order() -> Arc<RefundDesk> {
        let orders = Arc::new(InMemoryOrderStore::new());
        orders
            .save(Order {
                id: "order-1".into(),
                branch_id: "b-1".into(),
                cashier_id: "c-1".into(),
                customer_id: None,
                lines: vec![OrderLine {
                    id: "line-1".into(),
                    product_id: "shirt".into(),
                    name: "Shirt".into(),
                    unit_price: Money::from_major(100),
                    quantity: 2,
                    line_total: Money::from_major(200),
                }],
                payment_type: PaymentType::cash(),
                status: OrderStatus::Completed,
                subtotal: Money::from_major(250),
                discount: Money::from_major(25),
                total_amount: Money::from_major(225),
                created_at: Some(Utc::now()),
            })
            .await
            .unwrap();
        Arc::new(RefundDesk::new(orders, Arc::new(InMemoryRefundStore::new())))
    }

    fn request(qty: i64) -> RefundRequest {
        RefundRequest {
            order_id: "order-1".into(),
            selections: vec![ReturnSelection::new("line-1", qty)],
            reason: "damaged".into(),
            refund_payment_type: None,
            cashier_id: "c-2".into(),
            branch_id: "b-1".into(),
            shift_report_id: None,
        }
    }

    #[tokio::test]
    async fn test_issue_then_over_return() {
        let desk = desk_with_order().await;

        let refund = desk.issue(&request(1)).await.unwrap();
        assert_eq!(refund.amount, Money::from_major(100));
        assert_eq!(desk.state("order-1").await.unwrap(), RefundState::PartiallyRefunded);
        assert_eq!(desk.returnable("order-1").await.unwrap()[0].remaining.get(), 1);

        let err = desk.issue(&request(2)).await.unwrap_err();
        assert!(matches!(
            err.as_refund(),
            Some(RefundError::OverReturn(ReturnLimit::Quantity { remaining: 1, .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let desk = desk_with_order().await;
        let mut req = request(1);
        req.order_id = "order-404".into();

        let err = desk.issue(&req).await.unwrap_err();
        assert_eq!(err.as_refund(), Some(&RefundError::OrderNotFound("order-404".into())));
        assert!(matches!(
            desk.returnable("order-404").await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refunds_never_exceed_sold_quantity() {
        let desk = desk_with_order().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let desk = desk.clone();
                tokio::spawn(async move { desk.issue(&request(1)).await })
            })
            .collect();

        let mut issued = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                issued += 1;
            }
        }
        assert_eq!(issued, 2);
        assert!(desk.returnable("order-1").await.unwrap()[0].remaining.is_zero());
    }
}
