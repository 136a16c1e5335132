//! # Validation Module
//!
//! Input validation for sale forms and product records.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleInput ──► validate_sale_input ← THIS MODULE                        │
//! │                     │                                                   │
//! │                     ├── Err → nothing written, CoreError::Validation    │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │               SaleEngine (one SQLite transaction)                       │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │               SQLite: NOT NULL, UNIQUE, FOREIGN KEY, CHECK              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("RICE-5KG").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{Discount, DiscountType, SaleInput, SaleItemInput};
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_SALE_AMOUNT_CENTS, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// 100% in basis points.
const FULL_BPS: i64 = 10_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use tillbook_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product or line name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("productName"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "productName".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
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

/// Validates a price or cost in cents. Zero is allowed (free items).
///
/// ```rust
/// use tillbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX / 2).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_unit_amount("price", cents)
}

fn validate_unit_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates the amount paid against a sale. Zero is allowed (unpaid).
pub fn validate_amount_paid(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_not_be_negative("amountPaid"));
    }

    if cents > MAX_SALE_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amountPaid".to_string(),
            min: 0,
            max: MAX_SALE_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps as i64 > FULL_BPS {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: FULL_BPS,
        });
    }

    Ok(())
}

/// Validates a discount as entered.
///
/// Percentages must lie within 0..=10000 bps, amounts must not be negative.
pub fn validate_discount(field: &str, discount: &Discount) -> ValidationResult<()> {
    match discount.discount_type {
        DiscountType::Percentage if !(0..=FULL_BPS).contains(&discount.value) => {
            Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: FULL_BPS,
            })
        }
        DiscountType::Amount if discount.value < 0 => {
            Err(ValidationError::must_not_be_negative(field))
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Validates one line of a sale form.
pub fn validate_sale_item(item: &SaleItemInput) -> ValidationResult<()> {
    validate_product_name(&item.product_name)?;
    validate_quantity(item.quantity)?;
    validate_price_cents(item.selling_price_cents)?;
    validate_unit_amount("unitCost", item.unit_cost_cents)?;
    if let Some(product_id) = &item.product_id {
        validate_uuid(product_id)?;
    }
    validate_discount("itemDiscount", &item.discount)?;

    let gross = item.gross();
    let discount = item.resolved_discount();
    if discount > gross {
        return Err(ValidationError::DiscountExceedsLine {
            item: item.product_name.trim().to_string(),
            discount: discount.cents(),
            gross: gross.cents(),
        });
    }

    Ok(())
}

/// Validates a whole sale form before anything is written.
///
/// ## Rules
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  items          1..=MAX_SALE_ITEMS, each passing validate_sale_item    │
/// │  taxRateBps     0..=10000                                               │
/// │  discount       PERCENTAGE 0..=10000 bps, AMOUNT 0..=subtotal           │
/// │  amountPaid     0..=MAX_SALE_AMOUNT_CENTS                               │
/// │  cashAccountId  UUID when present                                       │
/// │  paymentStatus  any, QUOTE included                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_sale_input(input: &SaleInput) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if input.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for item in &input.items {
        validate_sale_item(item)?;
    }

    validate_tax_rate_bps(input.tax_rate_bps)?;
    validate_discount("discount", &input.discount)?;

    let subtotal: Money = input
        .items
        .iter()
        .map(|item| item.gross() - item.resolved_discount())
        .sum();
    let discount = input.discount.resolve(subtotal);
    if discount > subtotal {
        return Err(ValidationError::DiscountExceedsSubtotal {
            discount: discount.cents(),
            subtotal: subtotal.cents(),
        });
    }

    validate_amount_paid(input.amount_paid_cents)?;

    if let Some(account_id) = &input.cash_account_id {
        validate_uuid(account_id)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use tillbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
