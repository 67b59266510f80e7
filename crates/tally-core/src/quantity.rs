//! # Quantity Module
//!
//! Item counts for stock movement and returns. A `Quantity` can never be
//! negative: subtraction either fails (`checked_sub`) or stops at zero
//! (`saturating_sub`).
//!
//! ```rust
//! use tally_core::quantity::Quantity;
//!
//! let sold = Quantity::new(2).unwrap();
//! let returned = Quantity::new(1).unwrap();
//! let remaining = sold.checked_sub(returned).unwrap();
//! assert_eq!(remaining.get(), 1);
//! assert!(remaining.checked_sub(sold).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

/// A non-negative count of units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(try_from = "i64", into = "i64")]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity, rejecting negative counts.
    pub fn new(units: i64) -> Result<Self, ValidationError> {
        if units < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(Quantity(units))
    }

    /// Zero units.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Returns the raw unit count.
    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts, returning `None` instead of a negative movement.
    #[inline]
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        if other.0 > self.0 {
            None
        } else {
            Some(Quantity(self.0 - other.0))
        }
    }

    /// Adds, stopping at `i64::MAX`; both sides are non-negative so the sum
    /// cannot wrap below zero.
    #[inline]
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }

    /// Subtracts, stopping at zero.
    #[inline]
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(0))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = ValidationError;

    fn try_from(units: i64) -> Result<Self, Self::Error> {
        Quantity::new(units)
    }
}

impl From<Quantity> for i64 {
    fn from(qty: Quantity) -> Self {
        qty.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
