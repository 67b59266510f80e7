//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │      Order      │   │     Refund      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  unit_price     │──►│  lines (frozen) │◄──│  order_id (FK)  │       │
//! │  │  quantity       │   │  total_amount   │   │  lines, amount  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRule   │   │   OrderStatus   │   │  PaymentType    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  None           │   │  Pending        │   │  "cash"         │       │
//! │  │  Percentage     │   │  Completed      │   │  "card", "upi"  │       │
//! │  │  FixedAmount    │   │  Cancelled      │   │  (open set)     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  ShiftSession   │  shift_end == None  ⇒  session is open            │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tolerant Records
//! Orders and refunds come back from the backend, so the fields the
//! aggregator can survive without (`total_amount`, `created_at`, `lines`)
//! deserialize to zero / `None` / empty when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, BPS_SCALE};
use crate::quantity::Quantity;

// =============================================================================
// Payment Type
// =============================================================================

/// Payment codes that have a display label.
const KNOWN_PAYMENT_LABELS: &[(&str, &str)] = &[("cash", "Cash"), ("card", "Card"), ("upi", "UPI")];

/// A payment method code as supplied by the backend.
///
/// Open enumeration: the code is kept verbatim so new server-side methods
/// flow through reporting untouched. Known codes get a display label.
///
/// ```rust
/// use tally_core::types::PaymentType;
///
/// assert_eq!(PaymentType::new("UPI").label(), "UPI");
/// assert_eq!(PaymentType::new("upi").label(), "UPI");
/// assert_eq!(PaymentType::new("voucher").label(), "voucher");
/// assert_eq!(PaymentType::new("Voucher").code(), "Voucher");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct PaymentType(String);

impl PaymentType {
    pub fn new(code: impl Into<String>) -> Self {
        PaymentType(code.into())
    }

    pub fn cash() -> Self {
        PaymentType::new("cash")
    }

    pub fn card() -> Self {
        PaymentType::new("card")
    }

    pub fn upi() -> Self {
        PaymentType::new("upi")
    }

    /// The verbatim code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// True when the code is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Display label for known codes, the raw code otherwise.
    pub fn label(&self) -> &str {
        let code = self.0.trim();
        KNOWN_PAYMENT_LABELS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(code))
            .map(|(_, label)| *label)
            .unwrap_or(&self.0)
    }

    fn matches(&self, other: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentType {
    fn from(code: &str) -> Self {
        PaymentType::new(code)
    }
}

/// The payment codes a branch accepts at checkout.
///
/// Supplied by configuration, never hardcoded in the materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentTypeSet(Vec<String>);

impl PaymentTypeSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PaymentTypeSet(codes.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive, whitespace-trimmed membership check.
    pub fn accepts(&self, payment: &PaymentType) -> bool {
        !payment.is_blank() && self.0.iter().any(|code| payment.matches(code))
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| c.trim().is_empty())
    }
}

impl Default for PaymentTypeSet {
    fn default() -> Self {
        PaymentTypeSet::new(KNOWN_PAYMENT_LABELS.iter().map(|(code, _)| *code))
    }
}

// =============================================================================
// Cart Inputs
// =============================================================================

/// One product entry of a cart-in-progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product name at time of adding (frozen, may be empty).
    #[serde(default)]
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        LineItem {
            product_id: product_id.into(),
            name: String::new(),
            unit_price,
            quantity,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Unit price × quantity, saturating. Exact for any line that
    /// `pricing::price` accepted.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A one-off reduction applied to a cart subtotal.
///
/// ## Representation
/// Percentages are basis points like every rate in the system:
/// `Percentage { bps: 1000 }` is 10%. Use [`DiscountRule::percent`] for
/// whole percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountRule {
    #[default]
    None,
    Percentage { bps: u32 },
    FixedAmount { amount: Money },
}

impl DiscountRule {
    /// Whole-percent discount, clamped to 100%.
    pub fn percent(pct: u32) -> Self {
        DiscountRule::Percentage {
            bps: pct.saturating_mul(100).min(BPS_SCALE),
        }
    }

    pub fn fixed(amount: Money) -> Self {
        DiscountRule::FixedAmount { amount }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Held or deferred sale.
    Pending,
    /// Paid and finalized.
    #[default]
    Completed,
    /// Voided before payment settled.
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A frozen line of an order.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// unit_price × quantity at time of sale.
    pub line_total: Money,
}

/// An order record. Created once by the materializer, never mutated.
///
/// `total_amount` is stored redundantly and is never recomputed after
/// persistence; reporting reads it as a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub branch_id: String,
    pub cashier_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub total_amount: Money,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Looks up a line by its id.
    pub fn line(&self, line_item_id: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.id == line_item_id)
    }
}

// =============================================================================
// Refund
// =============================================================================

/// Units of one order line given back in a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundLine {
    pub line_item_id: String,
    pub product_id: String,
    pub quantity: Quantity,
    /// unit_price × quantity at the original sale price.
    pub amount: Money,
}

/// A refund record against one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub reason: String,
    #[serde(default)]
    pub amount: Money,
    /// Disbursement method.
    pub payment_type: PaymentType,
    pub cashier_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub shift_report_id: Option<String>,
    #[serde(default)]
    pub lines: Vec<RefundLine>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Shift Session
// =============================================================================

/// A bounded interval during which one cashier is on duty.
///
/// `shift_end` transitions from `None` to a timestamp exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftSession {
    pub id: String,
    pub cashier_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub shift_start: DateTime<Utc>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub shift_end: Option<DateTime<Utc>>,
}

impl ShiftSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.shift_end.is_none()
    }

    /// Open and already started at `as_of`.
    #[inline]
    pub fn is_active_at(&self, as_of: DateTime<Utc>) -> bool {
        self.is_open() && self.shift_start <= as_of
    }

    /// The end of the session, or `now` while it is still open.
    #[inline]
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.shift_end.unwrap_or(now)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
