//! # tillbook-db: Storage and Sale Engine for Tillbook
//!
//! SQLite storage (through sqlx) and the [`SaleEngine`] that keeps sales,
//! stock, cash and the audit ledgers consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Data Flow                               │
//! │                                                                         │
//! │  Caller (UI command, seed binary, tests)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  SaleEngine   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │───►│  (engine.rs)  │    │  (embedded)  │  │   │
//! │  │   │ SqlitePool    │    │ create/update │    │ 001_initial  │  │   │
//! │  │   │ write gate    │    │ delete/status │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   Repositories: product, cash, history, sale, sequence, stock │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite (WAL)   ~/.local/share/tillbook/tillbook.db             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - File and environment configuration
//! - [`engine`] - Atomic sale operations
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations and transaction helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_db::{Database, DbConfig, EngineConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tillbook.db")).await?;
//! let engine = db.engine(EngineConfig::default());
//!
//! let detail = engine.create(input, &user_id, &branch_id).await?;
//! println!("{}", detail.sale.sale_number); // SAL-2026-001
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DatabaseSettings, EngineConfig, TillbookConfig};
pub use engine::{Reversal, SaleEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cash::CashAccountRepository;
pub use repository::history::HistoryRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::AuditContext;
