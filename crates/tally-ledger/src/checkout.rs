//! # Checkout Service
//!
//! Completes a sale: materialize the cart, persist the order, clear the cart.
//!
//! ```text
//! Cart (owned by the terminal's session)
//!      │
//!      ▼
//! order::materialize_cart()  ── rejects: EmptyCart, InvalidLineItem, UnknownPaymentType
//!      │
//!      ▼
//! OrderStore::save()
//!      │
//!      ▼
//! cart.clear()   (only after the order is stored)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use tally_core::order::{materialize_cart, SaleContext};
use tally_core::{Cart, Order, PaymentType, PaymentTypeSet};

use crate::error::LedgerResult;
use crate::store::OrderStore;

pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    accepted: PaymentTypeSet,
}

impl CheckoutService {
    pub fn new(orders: Arc<dyn OrderStore>, accepted: PaymentTypeSet) -> Self {
        CheckoutService { orders, accepted }
    }

    pub fn accepted_payments(&self) -> &PaymentTypeSet {
        &self.accepted
    }

    /// Completes the sale at the current time.
    pub async fn complete_sale(
        &self,
        cart: &mut Cart,
        payment_type: PaymentType,
        ctx: &SaleContext,
    ) -> LedgerResult<Order> {
        self.complete_sale_at(cart, payment_type, ctx, Utc::now()).await
    }

    /// Completes the sale with an explicit timestamp.
    ///
    /// On any error the cart is left as it was.
    pub async fn complete_sale_at(
        &self,
        cart: &mut Cart,
        payment_type: PaymentType,
        ctx: &SaleContext,
        now: DateTime<Utc>,
    ) -> LedgerResult<Order> {
        let order = materialize_cart(cart, payment_type, ctx, &self.accepted, now)?;
        let order = self.orders.save(order).await?;

        let basket_secs = (now - cart.created_at()).num_seconds().max(0);
        cart.clear(now);

        info!(
            order_id = %order.id,
            branch_id = %order.branch_id,
            cashier_id = %order.cashier_id,
            total = %order.total_amount,
            payment = %order.payment_type,
            lines = order.lines.len(),
            basket_secs,
            "Sale completed"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::store::InMemoryOrderStore;
    use tally_core::{CoreError, DiscountRule, Money};

    fn service() -> (CheckoutService, Arc<InMemoryOrderStore>) {
        let store = Arc::new(InMemoryOrderStore::new());
        let service = CheckoutService::new(store.clone(), PaymentTypeSet::default());
        (service, store)
    }

    #[tokio::test]
    async fn test_complete_sale_stores_order_and_clears_cart() {
        let (service, store) = service();
        let mut cart = Cart::new(Utc::now());
        cart.add_item("p-1", "Shirt", Money::from_major(100), 2).unwrap();
        cart.add_item("p-2", "Socks", Money::from_major(50), 1).unwrap();
        cart.set_discount(DiscountRule::percent(10)).unwrap();

        let order = service
            .complete_sale(&mut cart, PaymentType::card(), &SaleContext::new("b-1", "c-1"))
            .await
            .unwrap();

        assert_eq!(order.total_amount, Money::from_major(225));
        assert!(cart.is_empty());
        assert_eq!(store.get(&order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_rejected_sale_keeps_cart() {
        let (service, _) = service();
        let mut cart = Cart::new(Utc::now());
        cart.add_item("p-1", "Shirt", Money::from_major(100), 1).unwrap();

        let err = service
            .complete_sale(&mut cart, PaymentType::new("crypto"), &SaleContext::new("b-1", "c-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::UnknownPaymentType(_))));
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_next_basket_starts_at_sale_time() {
        let (service, _) = service();
        let opened = Utc::now() - chrono::Duration::minutes(5);
        let sold = opened + chrono::Duration::minutes(3);
        let mut cart = Cart::new(opened);
        cart.add_item("p-1", "Shirt", Money::from_major(100), 1).unwrap();

        service
            .complete_sale_at(
                &mut cart,
                PaymentType::cash(),
                &SaleContext::new("b-1", "c-1"),
                sold,
            )
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.created_at(), sold);
    }
}
