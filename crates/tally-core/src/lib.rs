//! # tally-core: Pure Engine for Tally POS
//!
//! Cart pricing, order materialization, refund reconciliation and
//! sales/shift aggregation as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Dashboards / checkout / shift-close screens              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  tally-ledger: stores, CheckoutService, RefundDesk, ShiftDesk   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │   order   │  │  refund   │  │  report   │  │   │
//! │  │   │   cart    │  │ materialize│ │ reconcile │  │  shift    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOGGING • NO CLOCK • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] / [`quantity`] - Integer minor units and non-negative counts
//! - [`pricing`] / [`cart`] - Subtotal, discount, total; per-session cart
//! - [`order`] - Cart to immutable order
//! - [`refund`] - Partial returns against an order's refund history
//! - [`report`] - Sales aggregation
//! - [`shift`] - Cashier sessions and the shift-close summary
//! - [`types`], [`error`], [`validation`]
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: "now" is always a parameter
//! 2. **Integer Money**: All monetary values are minor units (i64)
//! 3. **Explicit Errors**: Rejections are typed, aggregation never fails
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tally_core::order::{materialize_cart, SaleContext};
//! use tally_core::{Cart, DiscountRule, Money, PaymentType, PaymentTypeSet};
//!
//! let mut cart = Cart::new(Utc::now());
//! cart.add_item("p-1", "Shirt", Money::from_major(100), 2).unwrap();
//! cart.add_item("p-2", "Socks", Money::from_major(50), 1).unwrap();
//! cart.set_discount(DiscountRule::percent(10)).unwrap();
//!
//! let order = materialize_cart(
//!     &cart,
//!     PaymentType::cash(),
//!     &SaleContext::new("branch-1", "cashier-1"),
//!     &PaymentTypeSet::default(),
//!     Utc::now(),
//! )
//! .unwrap();
//! assert_eq!(order.total_amount, Money::from_major(225));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod quantity;
pub mod refund;
pub mod report;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use error::{CoreError, CoreResult, RefundError, ReturnLimit, ShiftError, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use report::{AggregateOptions, AggregateSummary, ReportWindow};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum unique lines allowed in a single cart
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
