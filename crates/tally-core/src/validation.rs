//! # Field Validation
//!
//! Single-field checks run by `Cart` and `materialize_cart` before any money
//! is computed. Rules that span records (refund ceilings, one open shift per
//! cashier) live with the engine that owns those records.
//!
//! ```text
//! Cart::add_item("p-1", price, qty)
//!   ├── validate_quantity(qty)          1..=MAX_ITEM_QUANTITY
//!   ├── validate_price_cents(price)     >= 0, zero allowed for freebies
//!   └── validate_cart_size(len)         only for a new product id
//!
//! materialize_cart(.., ctx)
//!   └── validate_required_id(..)        branch_id, cashier_id
//! ```
//!
//! ```rust
//! use tally_core::validation::{validate_quantity, validate_required_id};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_required_id("cashier_id", "   ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::BPS_SCALE;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejects ids that are empty or whitespace.
pub fn validate_required_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Zero and negatives are `MustBePositive`; above `MAX_ITEM_QUANTITY` is `OutOfRange`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: BPS_SCALE as i64,
        });
    }

    Ok(())
}

/// Called before a new product id joins the cart; `current_items` is the
/// count of distinct lines already present.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
