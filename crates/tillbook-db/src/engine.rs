//! # Sale Engine
//!
//! Every write to a sale, and everything that moves with it: stock, cash
//! and both ledgers. Each operation is one SQLite transaction.
//!
//! ## One Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  engine.create(input, user, branch)                                    │
//! │       │                                                                 │
//! │       ├── validate_sale_input()           rejected before any write    │
//! │       ▼                                                                 │
//! │  ┌─ attempt ─────────────────────────────────────────────────────────┐ │
//! │  │  write_gate.lock()                     one engine write at a time │ │
//! │  │  pool.begin()                                                     │ │
//! │  │     next_sale_number → insert sale + items                        │ │
//! │  │     cash::credit            (account set, paid > 0)               │ │
//! │  │     stock::decrement × item (status is not QUOTE)                 │ │
//! │  │  commit                     any error: tx dropped → rolled back   │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │       │                                                                 │
//! │       ├── Busy / duplicate sale number → sleep, next attempt           │
//! │       └── attempts exhausted           → DbError::Conflict             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edits
//! An edit never patches stock by difference. It reverses what the old
//! version took ([`reverse_stock_commitment`]), replaces the items, then
//! takes stock for the new version ([`apply_stock_commitment`]). Cash moves
//! by the change in amount paid, or out of the old account and into the new
//! one when the account changed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use backoff::backoff::Backoff;
use chrono::{DateTime, Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{DbError, DbResult};
use crate::repository::sale::SaleRepository;
use crate::repository::{cash, sale, sequence, stock, AuditContext};
use tillbook_core::calculator::{calculate_input, Calculation};
use tillbook_core::validation::{validate_amount_paid, validate_sale_input};
use tillbook_core::{
    CoreError, HistoryType, Money, PaymentStatus, Product, ProductHistory, ReferenceType, Sale,
    SaleDetail, SaleInput, SaleItem,
};

// =============================================================================
// Stock Commitment
// =============================================================================

/// Why a sale gives its stock back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reversal {
    /// The sale is being edited; its new items are applied right after.
    Update,
    /// The sale is being deleted.
    Delete,
}

impl Reversal {
    pub fn history_type(self) -> HistoryType {
        match self {
            Reversal::Update => HistoryType::Adjustment,
            Reversal::Delete => HistoryType::ReturnIn,
        }
    }

    pub fn reference_type(self) -> ReferenceType {
        match self {
            Reversal::Update => ReferenceType::SaleUpdate,
            Reversal::Delete => ReferenceType::SaleDeleted,
        }
    }

    fn reason(self, sale_number: &str) -> String {
        match self {
            Reversal::Update => format!("Sale {sale_number} updated"),
            Reversal::Delete => format!("Sale {sale_number} deleted"),
        }
    }
}

/// Takes stock for every product line of `sale`, one SALE history row each.
///
/// Lines without a product (custom lines) are skipped.
pub async fn apply_stock_commitment(
    conn: &mut SqliteConnection,
    sale: &Sale,
    items: &[SaleItem],
    user_id: &str,
) -> DbResult<Vec<ProductHistory>> {
    let context = AuditContext::sale(
        user_id,
        &sale.id,
        ReferenceType::Sale,
        format!("Sale {}", sale.sale_number),
    );

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product_id) = &item.product_id {
            rows.push(stock::decrement(&mut *conn, product_id, item.quantity, &context).await?);
        }
    }

    Ok(rows)
}

/// Puts back the stock `items` took, one history row per product line.
pub async fn reverse_stock_commitment(
    conn: &mut SqliteConnection,
    sale: &Sale,
    items: &[SaleItem],
    reversal: Reversal,
    user_id: &str,
) -> DbResult<Vec<ProductHistory>> {
    let context = AuditContext::sale(
        user_id,
        &sale.id,
        reversal.reference_type(),
        reversal.reason(&sale.sale_number),
    );

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        if let Some(product_id) = &item.product_id {
            rows.push(
                stock::increment(
                    &mut *conn,
                    product_id,
                    item.quantity,
                    reversal.history_type(),
                    &context,
                )
                .await?,
            );
        }
    }

    Ok(rows)
}

// =============================================================================
// Engine
// =============================================================================

/// Creates, edits, deletes and settles sales.
///
/// Obtained from [`Database::engine`](crate::Database::engine); every engine
/// of one `Database` shares its write gate.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
    config: EngineConfig,
}

impl SaleEngine {
    pub fn new(pool: SqlitePool, write_gate: Arc<Mutex<()>>, config: EngineConfig) -> Self {
        SaleEngine {
            pool,
            write_gate,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records a new sale.
    ///
    /// ## Returns
    /// * `Ok(SaleDetail)` - the stored sale with its number and items
    /// * `Err(Domain(Validation))` - bad input, nothing written
    /// * `Err(Domain(ProductNotFound | CashAccountNotFound))` - unknown reference
    /// * `Err(Domain(InsufficientStock))` - a line would oversell
    /// * `Err(Conflict)` - still contended after `max_attempts`
    pub async fn create(&self, input: SaleInput, user_id: &str, branch_id: &str) -> DbResult<SaleDetail> {
        validate_sale_input(&input).map_err(CoreError::from)?;

        let input = &input;
        self.run("create", move || self.try_create(input, user_id, branch_id))
            .await
    }

    /// Replaces a sale's contents, status and payment.
    pub async fn update(&self, id: &str, input: SaleInput, user_id: &str) -> DbResult<SaleDetail> {
        validate_sale_input(&input).map_err(CoreError::from)?;

        let input = &input;
        self.run("update", move || self.try_update(id, input, user_id))
            .await
    }

    /// Deletes a sale, giving back its stock and its payment.
    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        self.run("delete", move || self.try_delete(id, user_id)).await
    }

    /// Moves a sale to `new_status` with a new amount paid.
    ///
    /// A QUOTE becoming committed takes its stock here, once. Moving back
    /// to QUOTE from a committed status is rejected.
    pub async fn update_payment_status(
        &self,
        id: &str,
        new_status: PaymentStatus,
        new_amount_paid_cents: i64,
        user_id: &str,
    ) -> DbResult<SaleDetail> {
        validate_amount_paid(new_amount_paid_cents).map_err(CoreError::from)?;

        self.run("update_payment_status", move || {
            self.try_update_payment_status(id, new_status, new_amount_paid_cents, user_id)
        })
        .await
    }

    /// Reads a sale with its items.
    pub async fn get(&self, id: &str) -> DbResult<SaleDetail> {
        SaleRepository::new(self.pool.clone())
            .get_detail(id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
    }

    // =========================================================================
    // Retry Loop
    // =========================================================================

    /// Runs `attempt_once` under the write gate until it succeeds, fails
    /// for good, or runs out of attempts.
    async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_once: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.config.backoff();

        loop {
            attempt += 1;

            let result = {
                let _gate = self.write_gate.lock().await;
                attempt_once().await
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    if attempt >= self.config.max_attempts {
                        warn!(operation, attempts = attempt, error = %err, "Giving up on contended write");
                        return Err(DbError::Conflict { attempts: attempt });
                    }

                    let Some(delay) = backoff.next_backoff() else {
                        warn!(operation, attempts = attempt, error = %err, "Backoff exhausted");
                        return Err(DbError::Conflict { attempts: attempt });
                    };
                    warn!(operation, attempt, error = %err, ?delay, "Retrying contended write");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // =========================================================================
    // Attempts
    // =========================================================================

    async fn try_create(&self, input: &SaleInput, user_id: &str, branch_id: &str) -> DbResult<SaleDetail> {
        let calculation = calculate_input(input);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let products = load_references(&mut *tx, input).await?;
        let number = sequence::next_sale_number(&mut *tx, now.year()).await?;

        let sale = build_sale(
            SaleIdentity {
                id: Uuid::new_v4().to_string(),
                sale_number: number.to_string(),
                branch_id: branch_id.to_string(),
                user_id: user_id.to_string(),
                created_at: now,
            },
            input,
            &calculation,
            input.date.unwrap_or(now),
            now,
        );
        let items = build_items(&sale.id, input, &calculation, &products, now);

        sale::insert_sale(&mut *tx, &sale).await?;
        sale::insert_items(&mut *tx, &items).await?;

        if let Some(account_id) = &sale.cash_account_id {
            if sale.amount_paid_cents > 0 {
                let context = AuditContext::sale(
                    user_id,
                    &sale.id,
                    ReferenceType::Sale,
                    format!("Sale {}", sale.sale_number),
                );
                cash::credit(&mut *tx, account_id, sale.amount_paid(), &context).await?;
            }
        }

        if sale.is_committed() {
            apply_stock_commitment(&mut *tx, &sale, &items, user_id).await?;
        }

        tx.commit().await?;

        info!(
            id = %sale.id,
            sale_number = %sale.sale_number,
            status = %sale.payment_status,
            total = %sale.total(),
            items = items.len(),
            "Sale created"
        );

        Ok(SaleDetail { sale, items })
    }

    async fn try_update(&self, id: &str, input: &SaleInput, user_id: &str) -> DbResult<SaleDetail> {
        let calculation = calculate_input(input);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let existing = sale::fetch_sale(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;
        existing.payment_status.ensure_transition(input.payment_status)?;

        let products = load_references(&mut *tx, input).await?;
        let old_items = sale::fetch_items(&mut *tx, id).await?;

        if existing.is_committed() {
            reverse_stock_commitment(&mut *tx, &existing, &old_items, Reversal::Update, user_id)
                .await?;
        }

        sale::delete_items(&mut *tx, id).await?;

        let updated = build_sale(
            SaleIdentity {
                id: existing.id.clone(),
                sale_number: existing.sale_number.clone(),
                branch_id: existing.branch_id.clone(),
                user_id: existing.user_id.clone(),
                created_at: existing.created_at,
            },
            input,
            &calculation,
            input.date.unwrap_or(existing.sale_date),
            now,
        );
        let items = build_items(&updated.id, input, &calculation, &products, now);

        sale::update_sale(&mut *tx, &updated).await?;
        sale::insert_items(&mut *tx, &items).await?;

        reconcile_cash(&mut *tx, &existing, &updated, user_id).await?;

        if updated.is_committed() {
            apply_stock_commitment(&mut *tx, &updated, &items, user_id).await?;
        }

        tx.commit().await?;

        info!(
            id = %updated.id,
            sale_number = %updated.sale_number,
            from = %existing.payment_status,
            to = %updated.payment_status,
            total = %updated.total(),
            items = items.len(),
            "Sale updated"
        );

        Ok(SaleDetail {
            sale: updated,
            items,
        })
    }

    async fn try_delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sale::fetch_sale(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;
        let items = sale::fetch_items(&mut *tx, id).await?;

        if existing.is_committed() {
            reverse_stock_commitment(&mut *tx, &existing, &items, Reversal::Delete, user_id).await?;
        }

        if let Some(account_id) = &existing.cash_account_id {
            if existing.amount_paid_cents > 0 {
                let context = AuditContext::sale(
                    user_id,
                    &existing.id,
                    ReferenceType::SaleDeleted,
                    Reversal::Delete.reason(&existing.sale_number),
                );
                cash::debit(&mut *tx, account_id, existing.amount_paid(), &context).await?;
            }
        }

        sale::delete_sale(&mut *tx, id).await?;

        tx.commit().await?;

        info!(
            id = %existing.id,
            sale_number = %existing.sale_number,
            status = %existing.payment_status,
            "Sale deleted"
        );

        Ok(())
    }

    async fn try_update_payment_status(
        &self,
        id: &str,
        new_status: PaymentStatus,
        new_amount_paid_cents: i64,
        user_id: &str,
    ) -> DbResult<SaleDetail> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let existing = sale::fetch_sale(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;
        existing.payment_status.ensure_transition(new_status)?;

        let items = sale::fetch_items(&mut *tx, id).await?;

        if existing.payment_status.commits_on(new_status) {
            apply_stock_commitment(&mut *tx, &existing, &items, user_id).await?;
        }

        if let Some(account_id) = &existing.cash_account_id {
            let delta = new_amount_paid_cents - existing.amount_paid_cents;
            if delta != 0 {
                let context = AuditContext::sale(
                    user_id,
                    &existing.id,
                    ReferenceType::SaleUpdate,
                    format!("Sale {} payment updated", existing.sale_number),
                );
                cash::apply_movement(&mut *tx, account_id, Money::from_cents(delta), &context).await?;
            }
        }

        sale::update_payment(
            &mut *tx,
            id,
            new_status,
            new_amount_paid_cents,
            existing.total_cents - new_amount_paid_cents,
            now,
        )
        .await?;

        let sale = sale::fetch_sale(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        tx.commit().await?;

        info!(
            id = %sale.id,
            sale_number = %sale.sale_number,
            from = %existing.payment_status,
            to = %sale.payment_status,
            amount_paid = %sale.amount_paid(),
            balance = %sale.balance(),
            "Sale payment status changed"
        );

        Ok(SaleDetail { sale, items })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Columns of a sale that never change after it is created.
struct SaleIdentity {
    id: String,
    sale_number: String,
    branch_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

/// Checks that the cash account and every referenced product exist, and
/// returns the products by id.
async fn load_references(
    conn: &mut SqliteConnection,
    input: &SaleInput,
) -> DbResult<HashMap<String, Product>> {
    if let Some(account_id) = &input.cash_account_id {
        if cash::find_account(&mut *conn, account_id).await?.is_none() {
            return Err(CoreError::CashAccountNotFound(account_id.clone()).into());
        }
    }

    let mut products = HashMap::new();
    for product_id in input.items.iter().filter_map(|item| item.product_id.as_ref()) {
        if products.contains_key(product_id) {
            continue;
        }
        let product = stock::find_product(&mut *conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
        products.insert(product_id.clone(), product);
    }

    Ok(products)
}

fn build_sale(
    identity: SaleIdentity,
    input: &SaleInput,
    calculation: &Calculation,
    sale_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Sale {
    let totals = &calculation.totals;

    Sale {
        id: identity.id,
        sale_number: identity.sale_number,
        customer_id: input.customer.id.clone(),
        customer_name: input.customer.name.clone(),
        customer_phone: input.customer.phone.clone(),
        customer_address: input.customer.address.clone(),
        source: input.source,
        sale_date,
        subtotal_cents: totals.subtotal.cents(),
        discount_value: input.discount.value,
        discount_type: input.discount.discount_type,
        discount_cents: totals.discount.cents(),
        tax_rate_bps: input.tax_rate_bps,
        tax_cents: totals.tax.cents(),
        total_cents: totals.total.cents(),
        amount_paid_cents: totals.amount_paid.cents(),
        balance_cents: totals.balance.cents(),
        payment_status: input.payment_status,
        cash_account_id: input.cash_account_id.clone(),
        branch_id: identity.branch_id,
        user_id: identity.user_id,
        notes: input.notes.clone(),
        created_at: identity.created_at,
        updated_at: now,
    }
}

/// Turns form lines into stored items, with discounts resolved to cents.
///
/// A line without its own SKU takes the product's.
fn build_items(
    sale_id: &str,
    input: &SaleInput,
    calculation: &Calculation,
    products: &HashMap<String, Product>,
    now: DateTime<Utc>,
) -> Vec<SaleItem> {
    input
        .items
        .iter()
        .zip(&calculation.line_totals)
        .map(|(line, line_total)| {
            let product = line.product_id.as_ref().and_then(|id| products.get(id));

            SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.trim().to_string(),
                sku: line
                    .sku
                    .clone()
                    .or_else(|| product.map(|p| p.sku.clone())),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
                selling_price_cents: line.selling_price_cents,
                discount_cents: line.resolved_discount().cents(),
                line_total_cents: line_total.cents(),
                created_at: now,
            }
        })
        .collect()
}

/// Moves cash so the ledger matches the edited sale.
async fn reconcile_cash(
    conn: &mut SqliteConnection,
    old: &Sale,
    new: &Sale,
    user_id: &str,
) -> DbResult<()> {
    let context = AuditContext::sale(
        user_id,
        &new.id,
        ReferenceType::SaleUpdate,
        Reversal::Update.reason(&new.sale_number),
    );

    if old.cash_account_id != new.cash_account_id {
        if let Some(old_account) = &old.cash_account_id {
            if old.amount_paid_cents > 0 {
                cash::debit(&mut *conn, old_account, old.amount_paid(), &context).await?;
            }
        }
        if let Some(new_account) = &new.cash_account_id {
            if new.amount_paid_cents > 0 {
                cash::credit(&mut *conn, new_account, new.amount_paid(), &context).await?;
            }
        }
    } else if let Some(account) = &new.cash_account_id {
        let delta = new.amount_paid() - old.amount_paid();
        if !delta.is_zero() {
            cash::apply_movement(&mut *conn, account, delta, &context).await?;
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tillbook_core::{Discount, SaleItemInput};

    fn fast() -> EngineConfig {
        EngineConfig {
            max_attempts: 3,
            retry_backoff_ms: 0,
            retry_max_backoff_ms: 0,
        }
    }

    async fn product(db: &Database, sku: &str, stock: i64) -> Product {
        db.products()
            .create(
                NewProduct {
                    branch_id: "branch-1".to_string(),
                    sku: sku.to_string(),
                    name: format!("Product {sku}"),
                    price_cents: 10_000,
                    cost_cents: 6_000,
                    initial_stock: stock,
                    allow_negative_stock: false,
                },
                "user-1",
            )
            .await
            .unwrap()
    }

    fn input(product: &Product, quantity: i64, status: PaymentStatus) -> SaleInput {
        SaleInput {
            customer: Default::default(),
            source: Default::default(),
            date: None,
            items: vec![SaleItemInput {
                product_id: Some(product.id.clone()),
                product_name: product.name.clone(),
                sku: None,
                quantity,
                unit_cost_cents: product.cost_cents,
                selling_price_cents: product.price_cents,
                discount: Discount::none(),
            }],
            discount: Discount::none(),
            tax_rate_bps: 1_800,
            payment_status: status,
            amount_paid_cents: 0,
            cash_account_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_run_retries_busy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = db.engine(fast());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value = engine
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DbError::Busy("database is locked".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_gives_up_with_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = db.engine(fast());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = engine
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbError::duplicate("sales.sale_number", "SAL-2026-001"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Conflict { attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_domain_errors() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = db.engine(fast());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = engine
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CoreError::SaleNotFound("x".to_string()).into())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reverse_then_apply_in_isolation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rice = product(&db, "RICE", 10).await;
        let engine = db.engine(fast());

        let detail = engine
            .create(input(&rice, 3, PaymentStatus::Unpaid), "user-1", "branch-1")
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&rice.id).await.unwrap().unwrap().stock, 7);

        let mut tx = db.pool().begin().await.unwrap();
        let reversed = reverse_stock_commitment(
            &mut *tx,
            &detail.sale,
            &detail.items,
            Reversal::Update,
            "user-1",
        )
        .await
        .unwrap();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].history_type, HistoryType::Adjustment);
        assert_eq!((reversed[0].old_stock, reversed[0].new_stock), (7, 10));
        assert_eq!(reversed[0].reference_type, Some(ReferenceType::SaleUpdate));

        let applied = apply_stock_commitment(&mut *tx, &detail.sale, &detail.items, "user-1")
            .await
            .unwrap();
        assert_eq!(applied[0].history_type, HistoryType::Sale);
        assert_eq!((applied[0].old_stock, applied[0].new_stock), (10, 7));
        assert_eq!(applied[0].reference_id.as_deref(), Some(detail.sale.id.as_str()));
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(&rice.id).await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_custom_lines_do_not_touch_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rice = product(&db, "RICE", 10).await;
        let engine = db.engine(fast());

        let mut sale_input = input(&rice, 1, PaymentStatus::Paid);
        sale_input.items.push(SaleItemInput {
            product_id: None,
            product_name: "Delivery".to_string(),
            sku: None,
            quantity: 1,
            unit_cost_cents: 0,
            selling_price_cents: 1_500,
            discount: Discount::none(),
        });

        let detail = engine.create(sale_input, "user-1", "branch-1").await.unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].sku.as_deref(), Some("RICE"));
        assert_eq!(detail.sale.subtotal_cents, 11_500);

        let history = db.history().for_reference(&detail.sale.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_runs_before_any_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rice = product(&db, "RICE", 10).await;
        let engine = db.engine(fast());

        let err = engine
            .create(input(&rice, 0, PaymentStatus::Paid), "user-1", "branch-1")
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.engine(fast()).get("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
    }
}
