//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (SaleEngine::create)                                        │
//! │     └── insert_sale() + insert_items()     status QUOTE or committed   │
//! │                                                                         │
//! │  2. EDIT (SaleEngine::update)                                          │
//! │     └── delete_items() → update_sale() → insert_items()                │
//! │         number, branch and created_at never change                     │
//! │                                                                         │
//! │  3. PAYMENT (SaleEngine::update_payment_status)                        │
//! │     └── update_payment()   status, amount paid, balance                │
//! │                                                                         │
//! │  4. DELETE (SaleEngine::delete)                                        │
//! │     └── delete_sale()      items go with it (ON DELETE CASCADE)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write helpers take the engine's transaction connection. Reads on
//! [`SaleRepository`] go through the pool.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillbook_core::{PaymentStatus, Sale, SaleDetail, SaleItem};

const SALE_SELECT: &str = r#"
    SELECT
        id, sale_number,
        customer_id, customer_name, customer_phone, customer_address,
        source, sale_date,
        subtotal_cents, discount_value, discount_type, discount_cents,
        tax_rate_bps, tax_cents, total_cents,
        amount_paid_cents, balance_cents, payment_status,
        cash_account_id, branch_id, user_id, notes,
        created_at, updated_at
    FROM sales
"#;

const ITEM_SELECT: &str = r#"
    SELECT
        id, sale_id, product_id, product_name, sku,
        quantity, unit_cost_cents, selling_price_cents,
        discount_cents, line_total_cents, created_at
    FROM sale_items
"#;

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a sale on the caller's connection.
pub async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("{SALE_SELECT} WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(sale)
}

/// Loads the items of a sale in entry order.
pub async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let sql = format!("{ITEM_SELECT} WHERE sale_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

/// Inserts the sale row.
pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_number,
            customer_id, customer_name, customer_phone, customer_address,
            source, sale_date,
            subtotal_cents, discount_value, discount_type, discount_cents,
            tax_rate_bps, tax_cents, total_cents,
            amount_paid_cents, balance_cents, payment_status,
            cash_account_id, branch_id, user_id, notes,
            created_at, updated_at
        ) VALUES (
            ?1, ?2,
            ?3, ?4, ?5, ?6,
            ?7, ?8,
            ?9, ?10, ?11, ?12,
            ?13, ?14, ?15,
            ?16, ?17, ?18,
            ?19, ?20, ?21, ?22,
            ?23, ?24
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.sale_number)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(&sale.customer_address)
    .bind(sale.source)
    .bind(sale.sale_date)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_value)
    .bind(sale.discount_type)
    .bind(sale.discount_cents)
    .bind(sale.tax_rate_bps)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.amount_paid_cents)
    .bind(sale.balance_cents)
    .bind(sale.payment_status)
    .bind(&sale.cash_account_id)
    .bind(&sale.branch_id)
    .bind(&sale.user_id)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites every editable column of a sale.
///
/// `sale_number`, `branch_id`, `user_id` and `created_at` are left as stored.
pub async fn update_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, status = %sale.payment_status, "Updating sale");

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            customer_id = ?2,
            customer_name = ?3,
            customer_phone = ?4,
            customer_address = ?5,
            source = ?6,
            sale_date = ?7,
            subtotal_cents = ?8,
            discount_value = ?9,
            discount_type = ?10,
            discount_cents = ?11,
            tax_rate_bps = ?12,
            tax_cents = ?13,
            total_cents = ?14,
            amount_paid_cents = ?15,
            balance_cents = ?16,
            payment_status = ?17,
            cash_account_id = ?18,
            notes = ?19,
            updated_at = ?20
        WHERE id = ?1
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(&sale.customer_address)
    .bind(sale.source)
    .bind(sale.sale_date)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_value)
    .bind(sale.discount_type)
    .bind(sale.discount_cents)
    .bind(sale.tax_rate_bps)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.amount_paid_cents)
    .bind(sale.balance_cents)
    .bind(sale.payment_status)
    .bind(&sale.cash_account_id)
    .bind(&sale.notes)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", &sale.id));
    }

    Ok(())
}

/// Inserts items in order.
///
/// Product details are copied onto each item so the sale reads the same
/// after the product is renamed or repriced.
pub async fn insert_items(conn: &mut SqliteConnection, items: &[SaleItem]) -> DbResult<()> {
    for item in items {
        debug!(sale_id = %item.sale_id, product_id = ?item.product_id, quantity = item.quantity, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, product_name, sku,
                quantity, unit_cost_cents, selling_price_cents,
                discount_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(&item.sku)
        .bind(item.quantity)
        .bind(item.unit_cost_cents)
        .bind(item.selling_price_cents)
        .bind(item.discount_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Removes all items of a sale. Returns how many went.
pub async fn delete_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes the sale row; its items cascade.
pub async fn delete_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting sale");

    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }

    Ok(())
}

/// Sets status, amount paid and balance.
pub async fn update_payment(
    conn: &mut SqliteConnection,
    id: &str,
    status: PaymentStatus,
    amount_paid_cents: i64,
    balance_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, status = %status, amount_paid_cents, "Updating sale payment");

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            payment_status = ?2,
            amount_paid_cents = ?3,
            balance_cents = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(amount_paid_cents)
    .bind(balance_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale reads.
///
/// All writes go through [`SaleEngine`](crate::engine::SaleEngine) so that
/// stock, cash and history move with them.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("{SALE_SELECT} WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by its number, e.g. `SAL-2026-042`.
    pub async fn get_by_number(&self, sale_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("{SALE_SELECT} WHERE sale_number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!("{ITEM_SELECT} WHERE sale_id = ?1 ORDER BY rowid");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Gets a sale together with its items.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;

        Ok(Some(SaleDetail { sale, items }))
    }

    /// Lists the most recent sales, optionally for one branch.
    pub async fn list_recent(&self, branch_id: Option<&str>, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = match branch_id {
            Some(branch_id) => {
                let sql = format!("{SALE_SELECT} WHERE branch_id = ?1 ORDER BY sale_date DESC, rowid DESC LIMIT ?2");
                sqlx::query_as::<_, Sale>(&sql)
                    .bind(branch_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{SALE_SELECT} ORDER BY sale_date DESC, rowid DESC LIMIT ?1");
                sqlx::query_as::<_, Sale>(&sql)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(sales)
    }

    /// Counts sales in a status.
    pub async fn count_by_status(&self, status: PaymentStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE payment_status = ?1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts all sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
