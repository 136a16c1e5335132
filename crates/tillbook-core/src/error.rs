//! # Error Types
//!
//! Domain errors for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  tillbook-core (this file)                                             │
//! │  ├── ValidationError  - bad input, rejected before any write           │
//! │  └── CoreError        - business rule violations                       │
//! │                                                                         │
//! │  tillbook-db                                                           │
//! │  └── DbError          - storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant renders as a message that can be shown to the user as-is.

use thiserror::Error;

use crate::status::PaymentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the sale engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale line points at a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Cash account not found: {0}")]
    CashAccountNotFound(String),

    /// Selling more than is on hand for a product that may not go negative.
    ///
    /// ```text
    /// Sale SAL-2026-014: Rice 5kg × 5
    ///      │
    ///      ▼
    /// stock = 3, allow_negative_stock = false
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "RICE-5KG", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// whole sale rolled back
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A committed sale cannot become a quote again.
    #[error("Cannot change payment status from {from} to {to}")]
    InvalidStatusTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A line discount larger than the line itself.
    #[error("Discount on '{item}' ({discount}) exceeds the line amount ({gross})")]
    DiscountExceedsLine {
        item: String,
        discount: i64,
        gross: i64,
    },

    /// A sale-level discount larger than the sum of its lines.
    #[error("Sale discount ({discount}) exceeds the subtotal ({subtotal})")]
    DiscountExceedsSubtotal { discount: i64, subtotal: i64 },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn must_not_be_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "RICE-5KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RICE-5KG: available 3, requested 5"
        );

        let err = CoreError::SaleNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Sale not found: abc");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("items").to_string(),
            "items is required"
        );
        assert_eq!(
            ValidationError::must_not_be_negative("amountPaid").to_string(),
            "amountPaid must not be negative"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
