//! # Product Repository
//!
//! Products the sale engine keeps stock for.
//!
//! ## Key Operations
//! - Create (opening stock booked as CREATED history)
//! - Lookups by id and by SKU within a branch
//! - Price / cost changes, each with its own history row
//! - Manual stock movements through the stock ledger
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  What writes what                                                       │
//! │                                                                         │
//! │  create          → products row + CREATED        (own transaction)      │
//! │  update_pricing  → price/cost  + PRICE_CHANGE / COST_CHANGE             │
//! │  adjust_stock    → stock::adjust_stock → stock + RESTOCK/ADJUSTMENT/…  │
//! │  SaleEngine      → stock::decrement/increment  (engine transaction)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::history::{HistoryRepository, NewHistoryEntry};
use crate::repository::{stock, AuditContext};
use tillbook_core::validation::{validate_price_cents, validate_product_name, validate_sku};
use tillbook_core::{CoreError, HistoryType, Product, ProductHistory, ValidationError};

const PRODUCT_SELECT: &str = r#"
    SELECT
        id, branch_id, sku, name,
        price_cents, cost_cents, stock,
        allow_negative_stock, is_active,
        created_at, updated_at
    FROM products
"#;

/// History types a person may record by hand.
const MANUAL_STOCK_TYPES: [HistoryType; 6] = [
    HistoryType::Restock,
    HistoryType::Adjustment,
    HistoryType::StockTake,
    HistoryType::TransferIn,
    HistoryType::TransferOut,
    HistoryType::ReturnIn,
];

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub branch_id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub initial_stock: i64,
    pub allow_negative_stock: bool,
}

impl NewProduct {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_price_cents(self.cost_cents)?;
        if self.initial_stock < 0 {
            return Err(ValidationError::must_not_be_negative("initialStock"));
        }
        Ok(())
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let rice = repo.get_by_sku("branch-1", "RICE-5KG").await?;
/// repo.adjust_stock(&rice.id, 24, HistoryType::Restock, &user_id, "Supplier delivery").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product and its CREATED history row.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the stored product
    /// * `Err(DbError::UniqueViolation)` - SKU already used in this branch
    pub async fn create(&self, new: NewProduct, user_id: &str) -> DbResult<Product> {
        new.validate().map_err(CoreError::from)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            branch_id: new.branch_id,
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            price_cents: new.price_cents,
            cost_cents: new.cost_cents,
            stock: new.initial_stock,
            allow_negative_stock: new.allow_negative_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Creating product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, branch_id, sku, name,
                price_cents, cost_cents, stock,
                allow_negative_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.branch_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, product.sku.clone()),
            other => other,
        })?;

        let mut entry = NewHistoryEntry::stock(
            &product.id,
            HistoryType::Created,
            0,
            product.stock,
            AuditContext::manual(user_id, "Product created"),
        );
        entry.new_price_cents = Some(product.price_cents);
        entry.new_cost_cents = Some(product.cost_cents);
        HistoryRepository::log(&mut *tx, &entry).await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by SKU within a branch.
    pub async fn get_by_sku(&self, branch_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE branch_id = ?1 AND sku = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products of a branch, sorted by name.
    pub async fn list_active(&self, branch_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE branch_id = ?1 AND is_active = 1 ORDER BY name LIMIT ?2");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Changes price and/or cost, logging one history row per field that
    /// actually changed.
    pub async fn update_pricing(
        &self,
        id: &str,
        price_cents: Option<i64>,
        cost_cents: Option<i64>,
        user_id: &str,
    ) -> DbResult<Product> {
        if let Some(price) = price_cents {
            validate_price_cents(price).map_err(CoreError::from)?;
        }
        if let Some(cost) = cost_cents {
            validate_price_cents(cost).map_err(CoreError::from)?;
        }

        let mut tx = self.pool.begin().await?;

        let current = stock::find_product(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        let new_price = price_cents.unwrap_or(current.price_cents);
        let new_cost = cost_cents.unwrap_or(current.cost_cents);

        debug!(id = %id, new_price, new_cost, "Updating product pricing");

        sqlx::query("UPDATE products SET price_cents = ?2, cost_cents = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(new_price)
            .bind(new_cost)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        let context = AuditContext::manual(user_id, "Pricing updated");

        if new_price != current.price_cents {
            let mut entry =
                NewHistoryEntry::stock(id, HistoryType::PriceChange, current.stock, 0, context.clone());
            entry.old_price_cents = Some(current.price_cents);
            entry.new_price_cents = Some(new_price);
            HistoryRepository::log(&mut *tx, &entry).await?;
        }

        if new_cost != current.cost_cents {
            let mut entry =
                NewHistoryEntry::stock(id, HistoryType::CostChange, current.stock, 0, context);
            entry.old_cost_cents = Some(current.cost_cents);
            entry.new_cost_cents = Some(new_cost);
            HistoryRepository::log(&mut *tx, &entry).await?;
        }

        let updated = stock::find_product(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Records a manual stock movement (delivery, count correction,
    /// transfer) in its own transaction.
    pub async fn adjust_stock(
        &self,
        id: &str,
        delta: i64,
        history_type: HistoryType,
        user_id: &str,
        reason: &str,
    ) -> DbResult<ProductHistory> {
        if !MANUAL_STOCK_TYPES.contains(&history_type) {
            return Err(CoreError::from(ValidationError::NotAllowed {
                field: "historyType".to_string(),
                allowed: vec![
                    "RESTOCK".to_string(),
                    "ADJUSTMENT".to_string(),
                    "STOCK_TAKE".to_string(),
                    "TRANSFER_IN".to_string(),
                    "TRANSFER_OUT".to_string(),
                    "RETURN_IN".to_string(),
                ],
            })
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let row = stock::adjust_stock(
            &mut *tx,
            id,
            delta,
            history_type,
            &AuditContext::manual(user_id, reason),
        )
        .await?;
        tx.commit().await?;

        Ok(row)
    }

    /// Soft-deletes a product. Past sales keep pointing at it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn rice() -> NewProduct {
        NewProduct {
            branch_id: "branch-1".to_string(),
            sku: "RICE-5KG".to_string(),
            name: "Rice 5kg".to_string(),
            price_cents: 10_000,
            cost_cents: 7_000,
            initial_stock: 12,
            allow_negative_stock: false,
        }
    }

    #[tokio::test]
    async fn test_create_logs_opening_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(rice(), "user-1").await.unwrap();

        let history = db.history().for_product(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].history_type, HistoryType::Created);
        assert_eq!((history[0].old_stock, history[0].new_stock), (0, 12));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_in_branch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().create(rice(), "user-1").await.unwrap();

        let err = db.products().create(rice(), "user-1").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "RICE-5KG"));

        let mut other_branch = rice();
        other_branch.branch_id = "branch-2".to_string();
        assert!(db.products().create(other_branch, "user-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_by_sku_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.products().create(rice(), "user-1").await.unwrap();

        let found = db.products().get_by_sku("branch-1", "RICE-5KG").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(db.products().get_by_sku("branch-2", "RICE-5KG").await.unwrap().is_none());

        db.products().deactivate(&created.id).await.unwrap();
        assert!(db.products().list_active("branch-1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_pricing_logs_each_change() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(rice(), "user-1").await.unwrap();

        let updated = db
            .products()
            .update_pricing(&product.id, Some(11_000), Some(7_000), "user-1")
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 11_000);

        let history = db.history().for_product(&product.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].history_type, HistoryType::PriceChange);
        assert_eq!(history[1].old_price_cents, Some(10_000));
        assert_eq!(history[1].new_price_cents, Some(11_000));
        assert_eq!(history[1].quantity_change, 0);
    }

    #[tokio::test]
    async fn test_manual_adjustment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(rice(), "user-1").await.unwrap();

        let row = db
            .products()
            .adjust_stock(&product.id, 24, HistoryType::Restock, "user-1", "Delivery")
            .await
            .unwrap();
        assert_eq!((row.old_stock, row.new_stock), (12, 36));

        let err = db
            .products()
            .adjust_stock(&product.id, -1, HistoryType::Sale, "user-1", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert_eq!(db.history().net_quantity(&product.id).await.unwrap(), 36);
    }
}
