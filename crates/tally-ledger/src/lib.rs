//! # tally-ledger: Collaborator Layer for Tally POS
//!
//! Everything around the pure engine that a deployment needs: store
//! traits with in-memory implementations, the checkout/refund/shift/report
//! services, configuration and logging.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CheckoutService ──► order::materialize_cart ──► OrderStore::save      │
//! │                                                                         │
//! │  RefundDesk ──► lock(order) ──► refund::reconcile ──► RefundStore::save │
//! │                                                                         │
//! │  ShiftDesk ──► shift::{open_session, close_session, shift_summary}     │
//! │                                                                         │
//! │  BranchReports ──► report::aggregate                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services read the clock; `tally-core` never does. Every service method
//! that depends on "now" has an `*_at` variant taking it explicitly.

pub mod checkout;
pub mod config;
pub mod error;
pub mod refunds;
pub mod reports;
pub mod shifts;
pub mod store;

pub use checkout::CheckoutService;
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use refunds::RefundDesk;
pub use reports::BranchReports;
pub use shifts::ShiftDesk;
pub use store::{
    InMemoryOrderStore, InMemoryRefundStore, InMemoryShiftSessionStore, OrderStore, RecordQuery,
    RefundStore, ShiftSessionStore,
};
