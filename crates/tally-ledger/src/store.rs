//! # Stores
//!
//! Persistence seams for orders, refunds and shift sessions.
//!
//! The engine never calls a store; services read from a store, hand plain
//! values to `tally-core`, and write the result back. The in-memory stores
//! here back the services in tests and in the `seed-report` binary.
//!
//! ## Query Shape
//! ```text
//! RecordQuery::all()
//!     .branch("b-1")          ← branch_id ==
//!     .cashier("c-1")         ← cashier_id ==
//!     .within(window)         ← created_at / shift_start inside [from, to]
//!                               (undated records never match a window)
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use tally_core::{Order, Refund, ReportWindow, ShiftSession};

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Query
// =============================================================================

/// Filters for range queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub branch_id: Option<String>,
    pub cashier_id: Option<String>,
    pub window: Option<ReportWindow>,
}

impl RecordQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn cashier(mut self, cashier_id: impl Into<String>) -> Self {
        self.cashier_id = Some(cashier_id.into());
        self
    }

    pub fn within(mut self, window: ReportWindow) -> Self {
        self.window = Some(window);
        self
    }

    fn matches(&self, branch_id: &str, cashier_id: &str, at: Option<DateTime<Utc>>) -> bool {
        let branch_ok = self.branch_id.as_deref().map_or(true, |b| b == branch_id);
        let cashier_ok = self.cashier_id.as_deref().map_or(true, |c| c == cashier_id);
        let time_ok = match (&self.window, at) {
            (None, _) => true,
            (Some(w), Some(at)) => w.contains(at),
            (Some(_), None) => false,
        };
        branch_ok && cashier_ok && time_ok
    }
}

// =============================================================================
// Traits
// =============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order. A blank id is replaced by a fresh one.
    async fn save(&self, order: Order) -> LedgerResult<Order>;

    async fn get(&self, id: &str) -> LedgerResult<Option<Order>>;

    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<Order>>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    /// Persists a new refund. A blank id is replaced by a fresh one.
    async fn save(&self, refund: Refund) -> LedgerResult<Refund>;

    /// Every refund recorded against `order_id`.
    async fn for_order(&self, order_id: &str) -> LedgerResult<Vec<Refund>>;

    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<Refund>>;
}

#[async_trait]
pub trait ShiftSessionStore: Send + Sync {
    /// Inserts or replaces a session by id.
    async fn save(&self, session: ShiftSession) -> LedgerResult<ShiftSession>;

    async fn get(&self, id: &str) -> LedgerResult<Option<ShiftSession>>;

    /// Window filters on `shift_start`.
    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<ShiftSession>>;
}

// =============================================================================
// In-Memory Stores
// =============================================================================

fn fresh_id_if_blank(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

/// Oldest first, undated first, ties by id.
fn by_time<T>(records: &mut [T], at: fn(&T) -> Option<DateTime<Utc>>, id: fn(&T) -> &str) {
    records.sort_by(|a, b| at(a).cmp(&at(b)).then_with(|| id(a).cmp(id(b))));
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, mut order: Order) -> LedgerResult<Order> {
        fresh_id_if_blank(&mut order.id);
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(LedgerError::duplicate("Order", &order.id));
        }
        debug!(order_id = %order.id, total = %order.total_amount, "Saving order");
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get(&self, id: &str) -> LedgerResult<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<Order>> {
        let mut found: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| query.matches(&o.branch_id, &o.cashier_id, o.created_at))
            .cloned()
            .collect();
        by_time(&mut found, |o| o.created_at, |o| o.id.as_str());
        Ok(found)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRefundStore {
    refunds: RwLock<HashMap<String, Refund>>,
}

impl InMemoryRefundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn save(&self, mut refund: Refund) -> LedgerResult<Refund> {
        fresh_id_if_blank(&mut refund.id);
        let mut refunds = self.refunds.write().await;
        if refunds.contains_key(&refund.id) {
            return Err(LedgerError::duplicate("Refund", &refund.id));
        }
        debug!(
            refund_id = %refund.id,
            order_id = %refund.order_id,
            amount = %refund.amount,
            "Saving refund"
        );
        refunds.insert(refund.id.clone(), refund.clone());
        Ok(refund)
    }

    async fn for_order(&self, order_id: &str) -> LedgerResult<Vec<Refund>> {
        let mut found: Vec<Refund> = self
            .refunds
            .read()
            .await
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        by_time(&mut found, |r| r.created_at, |r| r.id.as_str());
        Ok(found)
    }

    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<Refund>> {
        let mut found: Vec<Refund> = self
            .refunds
            .read()
            .await
            .values()
            .filter(|r| query.matches(&r.branch_id, &r.cashier_id, r.created_at))
            .cloned()
            .collect();
        by_time(&mut found, |r| r.created_at, |r| r.id.as_str());
        Ok(found)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShiftSessionStore {
    sessions: RwLock<HashMap<String, ShiftSession>>,
}

impl InMemoryShiftSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShiftSessionStore for InMemoryShiftSessionStore {
    async fn save(&self, mut session: ShiftSession) -> LedgerResult<ShiftSession> {
        fresh_id_if_blank(&mut session.id);
        debug!(
            session_id = %session.id,
            cashier_id = %session.cashier_id,
            open = session.is_open(),
            "Saving shift session"
        );
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &str) -> LedgerResult<Option<ShiftSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn list(&self, query: &RecordQuery) -> LedgerResult<Vec<ShiftSession>> {
        let mut found: Vec<ShiftSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| query.matches(&s.branch_id, &s.cashier_id, Some(s.shift_start)))
            .cloned()
            .collect();
        by_time(&mut found, |s| Some(s.shift_start), |s| s.id.as_str());
        Ok(found)
    }
}
