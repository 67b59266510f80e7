//! # Money Module
//!
//! Integer minor-unit amounts shared by pricing, refunds and reports.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FLOAT DRIFT                                                            │
//! │                                                                         │
//! │  Dashboards that sum floats drift:                                      │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  That drift is how "net sales" on two screens stops agreeing.           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every order total, refund and aggregate is an i64 of cents           │
//! │    Rounding happens in exactly one place: `percentage_of`               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // 100.00
//! let line = price.times(2);              // 200.00
//! let discount = line.percentage_of(1000); // 10% = 20.00
//! assert_eq!((line - discount).cents(), 18_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Net sales is a reporting figure and may go negative
/// - **Newtype over i64**: no currency field, one currency per store
/// - **No float constructor**: Amounts from the backend arrive in minor units
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price ──► pricing::subtotal ──► pricing::total ──► Order.total_amount
///                                                                        │
/// OrderLine.unit_price ──► refund::reconcile ──► Refund.amount           │
///                                                     │                  │
///                                                     ▼                  ▼
///                                          report::aggregate ──► AggregateSummary
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Wraps a count of minor units.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Whole major units, so `from_major(225)` is 225.00.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Major units, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Minor units past the major part, always 0..=99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line value for `qty` units at this unit price, saturating at the
    /// `i64` bounds.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).times(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Line value for `qty` units, `None` when it does not fit.
    #[inline]
    pub const fn checked_times(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` when the sum does not fit.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `bps / 10000` of this amount, rounded half-up.
    ///
    /// Uses an i128 intermediate so large subtotals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(25_000);
    /// assert_eq!(subtotal.percentage_of(1000).cents(), 2_500); // 10%
    /// assert_eq!(Money::from_cents(1000).percentage_of(825).cents(), 83); // 82.5 -> 83
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        let scaled = self.0 as i128 * bps as i128;
        let half = (BPS_SCALE / 2) as i128;
        let rounded = if scaled >= 0 {
            (scaled + half) / BPS_SCALE as i128
        } else {
            (scaled - half) / BPS_SCALE as i128
        };
        Money(rounded as i64)
    }

    /// Restricts the value to `[min, max]`.
    ///
    /// If `max < min` the result is `min`.
    #[inline]
    pub fn clamp_between(self, min: Money, max: Money) -> Money {
        if self.0 < min.0 {
            min
        } else if self.0 > max.0 {
            max.max(min)
        } else {
            self
        }
    }

    /// Floors negative values at zero.
    #[inline]
    pub fn floor_zero(self) -> Money {
        if self.0 < 0 {
            Money::zero()
        } else {
            self
        }
    }

    /// Average over `count` items using integer division; zero when `count == 0`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(30_000).average_over(2).cents(), 15_000);
    /// assert_eq!(Money::from_cents(30_000).average_over(0), Money::zero());
    /// ```
    #[inline]
    pub fn average_over(&self, count: usize) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money(self.0 / count as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

// Operators saturate at the i64 bounds so folding untrusted backend records
// cannot panic. Pricing uses the checked forms and rejects overflow instead.

/// Plain `major.minor` with no currency symbol; used in logs and error text.
/// Dashboards format for their own locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "{}.{:02}", self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.times(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
