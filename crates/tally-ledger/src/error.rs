//! # Ledger Error Types
//!
//! Error types for store lookups, services and configuration.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError / RefundError / ShiftError (tally-core)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError (this module) ← adds store and config failures            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller renders a message for the cashier                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::{CoreError, RefundError, ShiftError};
use thiserror::Error;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Entity not found in the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record with the same id was already written.
    ///
    /// ## When This Occurs
    /// - Saving the same order or refund twice
    #[error("Duplicate {entity}: '{id}' already exists")]
    Duplicate { entity: String, id: String },

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid ledger configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LedgerError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity: &str, id: impl Into<String>) -> Self {
        LedgerError::Duplicate {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// The refund rejection, if this error is one.
    pub fn as_refund(&self) -> Option<&RefundError> {
        match self {
            LedgerError::Core(CoreError::Refund(e)) => Some(e),
            _ => None,
        }
    }

    /// The shift rejection, if this error is one.
    pub fn as_shift(&self) -> Option<&ShiftError> {
        match self {
            LedgerError::Core(CoreError::Shift(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<RefundError> for LedgerError {
    fn from(err: RefundError) -> Self {
        LedgerError::Core(err.into())
    }
}

impl From<ShiftError> for LedgerError {
    fn from(err: ShiftError) -> Self {
        LedgerError::Core(err.into())
    }
}
