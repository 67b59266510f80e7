//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Cart / order layer, wraps the others           │
//! │  ├── RefundError      - Refund reconciliation rejections               │
//! │  ├── ShiftError       - Session open/close rejections                  │
//! │  └── ValidationError  - Field-level input validation failures          │
//! │                                                                         │
//! │  tally-ledger errors (separate crate)                                  │
//! │  └── LedgerError      - Store lookups, configuration                   │
//! │                                                                         │
//! │  Aggregation never fails: malformed records are skipped or zeroed.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here rejects BEFORE a value is produced, so a failed call
//! leaves carts, orders and refund history untouched.

use std::fmt;

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and order layer errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line item has a negative price or a quantity below one.
    #[error("Invalid line item {product_id}: {reason}")]
    InvalidLineItem { product_id: String, reason: String },

    /// Tried to materialize an order from an empty cart.
    #[error("Cannot create an order from an empty cart")]
    EmptyCart,

    /// Payment code is not in the configured accepted set.
    ///
    /// ## When This Occurs
    /// - Checkout picked a method the branch does not accept
    /// - The accepted set was not updated after a backend rollout
    #[error("Unknown payment type: {0}")]
    UnknownPaymentType(String),

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart operation referenced a product that is not in the cart.
    #[error("Product {0} not in cart")]
    ProductNotInCart(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Refund rejected: {0}")]
    Refund(#[from] RefundError),

    #[error("Shift rejected: {0}")]
    Shift(#[from] ShiftError),
}

impl CoreError {
    /// Creates an InvalidLineItem error.
    pub fn invalid_line(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidLineItem {
            product_id: product_id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Refund Error
// =============================================================================

/// Which ceiling a refund request broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLimit {
    /// More units than remain returnable on one line.
    Quantity {
        line_item_id: String,
        requested: i64,
        remaining: i64,
    },
    /// More money than remains refundable on the order.
    Amount { requested: Money, remaining: Money },
}

impl fmt::Display for ReturnLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnLimit::Quantity {
                line_item_id,
                requested,
                remaining,
            } => write!(
                f,
                "line {line_item_id}: requested {requested}, only {remaining} returnable"
            ),
            ReturnLimit::Amount {
                requested,
                remaining,
            } => write!(f, "amount {requested} exceeds refundable balance {remaining}"),
        }
    }
}

/// Refund reconciliation errors, listed in the order they are checked.
///
/// ## User Workflow
/// ```text
/// Select items to return
///      │
///      ▼
/// reconcile() ──► OrderNotFound / AlreadyFullyRefunded
///      │
///      ├──────► EmptySelection / LineItemNotFound
///      │
///      ├──────► OverReturn { 2 requested, 1 returnable }
///      │
///      ├──────► MissingReason / MissingRefundMethod
///      │
///      ▼
/// Refund record (caller persists it)
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefundError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Cancelled orders were never charged.
    #[error("Order {order_id} is {status}, cannot refund")]
    OrderNotRefundable { order_id: String, status: String },

    #[error("Order {0} is already fully refunded")]
    AlreadyFullyRefunded(String),

    #[error("No items selected for return")]
    EmptySelection,

    #[error("Line item {0} is not part of this order")]
    LineItemNotFound(String),

    #[error("Return exceeds what was sold: {0}")]
    OverReturn(ReturnLimit),

    #[error("A refund reason is required")]
    MissingReason,

    #[error("A refund method is required")]
    MissingRefundMethod,
}

// =============================================================================
// Shift Error
// =============================================================================

/// Shift session errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShiftError {
    #[error("Shift {0} is already closed")]
    AlreadyClosed(String),

    #[error("Shift {session_id} cannot end before it started")]
    InvalidEndTime { session_id: String },

    /// A cashier may hold one open session at a time.
    #[error("Cashier {cashier_id} already has an open shift ({session_id})")]
    SessionAlreadyOpen {
        cashier_id: String,
        session_id: String,
    },

    #[error("Shift not found: {0}")]
    SessionNotFound(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level rejections raised by `validation` before any pricing runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_line("COKE-330", "quantity must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid line item COKE-330: quantity must be at least 1"
        );
        assert_eq!(
            CoreError::UnknownPaymentType("crypto".into()).to_string(),
            "Unknown payment type: crypto"
        );
    }

    #[test]
    fn test_over_return_messages() {
        let err = RefundError::OverReturn(ReturnLimit::Quantity {
            line_item_id: "line-1".into(),
            requested: 2,
            remaining: 1,
        });
        assert_eq!(
            err.to_string(),
            "Return exceeds what was sold: line line-1: requested 2, only 1 returnable"
        );

        let err = RefundError::OverReturn(ReturnLimit::Amount {
            requested: Money::from_cents(25_000),
            remaining: Money::from_cents(22_500),
        });
        assert_eq!(
            err.to_string(),
            "Return exceeds what was sold: amount 250.00 exceeds refundable balance 225.00"
        );
    }

    #[test]
    fn test_layer_errors_convert_to_core_error() {
        let core: CoreError = RefundError::EmptySelection.into();
        assert!(matches!(core, CoreError::Refund(RefundError::EmptySelection)));

        let core: CoreError = ShiftError::AlreadyClosed("s-1".into()).into();
        assert!(matches!(core, CoreError::Shift(_)));

        let core: CoreError = ValidationError::Required {
            field: "reason".into(),
        }
        .into();
        assert!(matches!(core, CoreError::Validation(_)));
    }
}
