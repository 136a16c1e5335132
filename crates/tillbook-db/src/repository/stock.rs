//! # Stock Ledger
//!
//! The only code that writes `products.stock`.
//!
//! ## One Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  adjust_stock(conn, product, -3, SALE, ctx)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET stock = stock + (-3)                               │
//! │   WHERE id = ? AND (delta >= 0 OR allow_negative_stock OR stock >= 3)  │
//! │   RETURNING stock                            ◄── single statement,      │
//! │       │                                          no read-modify-write   │
//! │       ├── no row, product missing → ProductNotFound                     │
//! │       ├── no row, product found   → InsufficientStock                   │
//! │       ▼                                                                 │
//! │  INSERT product_history (old = new + 3, new, qty = -3, ctx)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both statements run on the caller's connection, so the stock change and
//! its history row commit or roll back together.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::history::{HistoryRepository, NewHistoryEntry};
use crate::repository::AuditContext;
use tillbook_core::{CoreError, HistoryType, Product, ProductHistory};

/// Loads a product on the caller's connection.
pub async fn find_product(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT
            id, branch_id, sku, name,
            price_cents, cost_cents, stock,
            allow_negative_stock, is_active,
            created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Moves stock by `delta` and logs the movement.
///
/// ## Returns
/// * `Ok(ProductHistory)` - the row written, carrying old and new stock
/// * `Err(Domain(ProductNotFound))` - no such product
/// * `Err(Domain(InsufficientStock))` - would go below zero and the
///   product does not allow negative stock
pub async fn adjust_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    history_type: HistoryType,
    context: &AuditContext,
) -> DbResult<ProductHistory> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET
            stock = stock + ?2,
            updated_at = ?3
        WHERE id = ?1
          AND (?2 >= 0 OR allow_negative_stock = 1 OR stock + ?2 >= 0)
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(new_stock) = new_stock else {
        return Err(match find_product(conn, product_id).await? {
            None => CoreError::ProductNotFound(product_id.to_string()),
            Some(product) => CoreError::InsufficientStock {
                sku: product.sku,
                available: product.stock,
                requested: -delta,
            },
        }
        .into());
    };

    let old_stock = new_stock - delta;

    debug!(
        product_id = %product_id,
        delta,
        old_stock,
        new_stock,
        "Stock adjusted"
    );

    let entry = NewHistoryEntry::stock(product_id, history_type, old_stock, delta, context.clone());
    HistoryRepository::log(conn, &entry).await
}

/// Takes `quantity` units out of stock for a sale.
pub async fn decrement(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    context: &AuditContext,
) -> DbResult<ProductHistory> {
    adjust_stock(conn, product_id, -quantity, HistoryType::Sale, context).await
}

/// Puts `quantity` units back, recorded as `history_type`.
pub async fn increment(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    history_type: HistoryType,
    context: &AuditContext,
) -> DbResult<ProductHistory> {
    adjust_stock(conn, product_id, quantity, history_type, context).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use crate::DbError;

    async fn setup(stock: i64, allow_negative: bool) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(
                NewProduct {
                    branch_id: "branch-1".to_string(),
                    sku: "RICE-5KG".to_string(),
                    name: "Rice 5kg".to_string(),
                    price_cents: 10_000,
                    cost_cents: 7_000,
                    initial_stock: stock,
                    allow_negative_stock: allow_negative,
                },
                "user-1",
            )
            .await
            .unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_decrement_writes_matching_history() {
        let (db, product) = setup(10, false).await;
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        let row = decrement(&mut *tx, &product.id, 3, &ctx).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(row.history_type, HistoryType::Sale);
        assert_eq!((row.old_stock, row.new_stock, row.quantity_change), (10, 7, -3));

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 7);
    }

    #[tokio::test]
    async fn test_oversell_rejected_without_writing() {
        let (db, product) = setup(2, false).await;
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        let err = decrement(&mut *tx, &product.id, 3, &ctx).await.unwrap_err();
        drop(tx);

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 2);
        // only the CREATED row
        assert_eq!(db.history().for_product(&product.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_stock_allowed_by_flag() {
        let (db, product) = setup(1, true).await;
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        let row = decrement(&mut *tx, &product.id, 4, &ctx).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(row.new_stock, -3);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let (db, _) = setup(1, false).await;
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        let err = increment(&mut *tx, "missing", 1, HistoryType::Restock, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(ref id)) if id == "missing"));
    }
}
