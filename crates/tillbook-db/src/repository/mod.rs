//! # Repository Module
//!
//! Database repository implementations for Tillbook.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Repositories (own a pool clone)        Transaction helpers             │
//! │  ───────────────────────────────        ──────────────────────          │
//! │  db.products().get_by_id(id)            stock::decrement(conn, ..)      │
//! │  db.cash_accounts().list(branch)        cash::credit(conn, ..)          │
//! │  db.history().for_reference(sale)       HistoryRepository::log(conn, ..)│
//! │  db.sales().get_detail(id)              sale::insert_sale(conn, ..)     │
//! │                                         sequence::next_sale_number(..)  │
//! │       │                                        │                        │
//! │       │ reads, standalone writes               │ &mut SqliteConnection  │
//! │       ▼                                        ▼ of the caller's tx     │
//! │  SQLite                                 SaleEngine transaction          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Helpers never open or commit transactions. Whoever holds the
//! transaction decides whether everything it wrote survives.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products, pricing, manual stock moves
//! - [`CashAccountRepository`](cash::CashAccountRepository) - Cash accounts and their movements
//! - [`HistoryRepository`](history::HistoryRepository) - Product history (audit ledger)
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads
//! - [`sequence`] - Sale number allocation
//! - [`stock`] - The only writer of `products.stock`

use tillbook_core::ReferenceType;

pub mod cash;
pub mod history;
pub mod product;
pub mod sale;
pub mod sequence;
pub mod stock;

/// Who and what a ledger row is attributed to.
///
/// Shared by product history and cash movements so both ledgers of one
/// engine operation point at the same sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: String,
    pub reference_id: Option<String>,
    pub reference_type: Option<ReferenceType>,
    pub reason: Option<String>,
}

impl AuditContext {
    /// A change made by hand, not tied to a sale.
    pub fn manual(user_id: impl Into<String>, reason: impl Into<String>) -> Self {
        AuditContext {
            user_id: user_id.into(),
            reference_id: None,
            reference_type: Some(ReferenceType::Manual),
            reason: Some(reason.into()),
        }
    }

    /// A change caused by a sale.
    pub fn sale(
        user_id: impl Into<String>,
        sale_id: impl Into<String>,
        reference_type: ReferenceType,
        reason: impl Into<String>,
    ) -> Self {
        AuditContext {
            user_id: user_id.into(),
            reference_id: Some(sale_id.into()),
            reference_type: Some(reference_type),
            reason: Some(reason.into()),
        }
    }
}
