//! # Product History Repository
//!
//! The audit ledger: one immutable row per stock or pricing change.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product_history                                                        │
//! │                                                                         │
//! │  type        qty   old → new   reference            reason              │
//! │  CREATED     +10     0 → 10    -                    Product created     │
//! │  SALE         -2    10 → 8     sale 7f3… SALE       Sale SAL-2026-001   │
//! │  ADJUSTMENT   +2     8 → 10    sale 7f3… SALE_UPDATE Sale SAL-2026-001…│
//! │  SALE         -3    10 → 7     sale 7f3… SALE       Sale SAL-2026-001   │
//! │  RETURN_IN    +3     7 → 10    sale 7f3… SALE_DELETED …                │
//! │                                                                         │
//! │  Σ qty == current stock, every row new = old + qty                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are written through [`HistoryRepository::log`] inside the caller's
//! transaction. SQLite triggers reject any UPDATE or DELETE on the table.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::AuditContext;
use tillbook_core::{HistoryType, ProductHistory};

const HISTORY_SELECT: &str = r#"
    SELECT
        id, product_id, user_id, history_type,
        quantity_change, old_stock, new_stock,
        old_price_cents, new_price_cents, old_cost_cents, new_cost_cents,
        reference_id, reference_type, reason, created_at
    FROM product_history
"#;

/// A history row about to be written.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub product_id: String,
    pub history_type: HistoryType,
    pub quantity_change: i64,
    pub old_stock: i64,
    pub new_stock: i64,
    pub old_price_cents: Option<i64>,
    pub new_price_cents: Option<i64>,
    pub old_cost_cents: Option<i64>,
    pub new_cost_cents: Option<i64>,
    pub context: AuditContext,
}

impl NewHistoryEntry {
    /// A stock movement from `old_stock` by `quantity_change`.
    pub fn stock(
        product_id: impl Into<String>,
        history_type: HistoryType,
        old_stock: i64,
        quantity_change: i64,
        context: AuditContext,
    ) -> Self {
        NewHistoryEntry {
            product_id: product_id.into(),
            history_type,
            quantity_change,
            old_stock,
            new_stock: old_stock + quantity_change,
            old_price_cents: None,
            new_price_cents: None,
            old_cost_cents: None,
            new_cost_cents: None,
            context,
        }
    }
}

/// Repository for the product history ledger.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Appends one row on the caller's connection.
    pub async fn log(conn: &mut SqliteConnection, entry: &NewHistoryEntry) -> DbResult<ProductHistory> {
        let row = ProductHistory {
            id: Uuid::new_v4().to_string(),
            product_id: entry.product_id.clone(),
            user_id: entry.context.user_id.clone(),
            history_type: entry.history_type,
            quantity_change: entry.quantity_change,
            old_stock: entry.old_stock,
            new_stock: entry.new_stock,
            old_price_cents: entry.old_price_cents,
            new_price_cents: entry.new_price_cents,
            old_cost_cents: entry.old_cost_cents,
            new_cost_cents: entry.new_cost_cents,
            reference_id: entry.context.reference_id.clone(),
            reference_type: entry.context.reference_type,
            reason: entry.context.reason.clone(),
            created_at: Utc::now(),
        };

        debug!(
            product_id = %row.product_id,
            history_type = ?row.history_type,
            quantity_change = row.quantity_change,
            old_stock = row.old_stock,
            new_stock = row.new_stock,
            reference_id = ?row.reference_id,
            "Logging product history"
        );

        sqlx::query(
            r#"
            INSERT INTO product_history (
                id, product_id, user_id, history_type,
                quantity_change, old_stock, new_stock,
                old_price_cents, new_price_cents, old_cost_cents, new_cost_cents,
                reference_id, reference_type, reason, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15
            )
            "#,
        )
        .bind(&row.id)
        .bind(&row.product_id)
        .bind(&row.user_id)
        .bind(row.history_type)
        .bind(row.quantity_change)
        .bind(row.old_stock)
        .bind(row.new_stock)
        .bind(row.old_price_cents)
        .bind(row.new_price_cents)
        .bind(row.old_cost_cents)
        .bind(row.new_cost_cents)
        .bind(&row.reference_id)
        .bind(row.reference_type)
        .bind(&row.reason)
        .bind(row.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Full history of one product, oldest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<ProductHistory>> {
        let sql = format!("{HISTORY_SELECT} WHERE product_id = ?1 ORDER BY rowid");
        let rows = sqlx::query_as::<_, ProductHistory>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every row a sale produced, across all its creates, edits and deletion.
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<ProductHistory>> {
        let sql = format!("{HISTORY_SELECT} WHERE reference_id = ?1 ORDER BY rowid");
        let rows = sqlx::query_as::<_, ProductHistory>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Sum of all quantity changes for a product. Equals current stock when
    /// the ledger is complete.
    pub async fn net_quantity(&self, product_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity_change) FROM product_history WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }
}
