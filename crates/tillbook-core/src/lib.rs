//! # tillbook-core: Pure Sale Logic for Tillbook
//!
//! Everything about a sale that can be decided without a database: money,
//! totals, sale numbers, the payment-status state machine and input rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Sales Engine                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Caller (UI command, import job, API)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SaleInput                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           tillbook-db: SaleEngine + repositories                │   │
//! │  │   one SQLite transaction per create / update / delete / status  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tillbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │calculator│ │ sequence │ │  status  │          │   │
//! │  │   │  Money   │ │ totals   │ │ SAL-Y-N  │ │ QUOTE?   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                       │   │
//! │  │   │  types   │ │validation│ │  error   │                       │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sale, SaleItem, Product, CashAccount, ledger rows, inputs
//! - [`money`] - Money type with integer arithmetic
//! - [`calculator`] - Line and sale totals
//! - [`sequence`] - `SAL-<year>-<counter>` formatting and parsing
//! - [`status`] - PaymentStatus and its commitment rule
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::calculator::calculate_input;
//! use tillbook_core::{PaymentStatus, SaleInput, SaleItemInput, Discount};
//!
//! let input = SaleInput {
//!     customer: Default::default(),
//!     source: Default::default(),
//!     date: None,
//!     items: vec![SaleItemInput {
//!         product_id: None,
//!         product_name: "Rice 5kg".into(),
//!         sku: None,
//!         quantity: 2,
//!         unit_cost_cents: 7_000,
//!         selling_price_cents: 10_000,
//!         discount: Discount::none(),
//!     }],
//!     discount: Discount::none(),
//!     tax_rate_bps: 1800,
//!     payment_status: PaymentStatus::Paid,
//!     amount_paid_cents: 23_600,
//!     cash_account_id: None,
//!     notes: None,
//! };
//!
//! let totals = calculate_input(&input).totals;
//! assert_eq!(totals.total.cents(), 23_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod error;
pub mod money;
pub mod sequence;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculator::{Calculation, SaleTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sequence::SaleNumber;
pub use status::PaymentStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale.
pub const MAX_SALE_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// Catches typos like 10000 for 10 before they hit stock.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum unit price or unit cost, in cents (100,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Largest amount a sale can add up to, and so the cap on amounts paid and
/// sale-level discounts. Keeps every cents sum well inside `i64`.
pub const MAX_SALE_AMOUNT_CENTS: i64 = MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_SALE_ITEMS as i64;
