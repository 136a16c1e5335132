//! # Cash Ledger
//!
//! Cash accounts (tills, bank, mobile money) and their movement log.
//!
//! Balances change only through [`credit`] and [`debit`], which apply the
//! delta in one `UPDATE … RETURNING` and append a `cash_movements` row on
//! the same connection.
//!
//! ```text
//! credit(till, 236.00)   balance 100.00 → 336.00   movement +23600
//! debit(till,  236.00)   balance 336.00 → 100.00   movement -23600
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::AuditContext;
use tillbook_core::validation::ValidationResult;
use tillbook_core::{CashAccount, CashMovement, CoreError, Money, ValidationError};

const ACCOUNT_SELECT: &str = r#"
    SELECT id, branch_id, name, current_balance_cents, created_at, updated_at
    FROM cash_accounts
"#;

const MOVEMENT_SELECT: &str = r#"
    SELECT
        id, cash_account_id, user_id, amount_cents,
        old_balance_cents, new_balance_cents,
        reference_id, reference_type, reason, created_at
    FROM cash_movements
"#;

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads an account on the caller's connection.
pub async fn find_account(conn: &mut SqliteConnection, account_id: &str) -> DbResult<Option<CashAccount>> {
    let sql = format!("{ACCOUNT_SELECT} WHERE id = ?1");
    let account = sqlx::query_as::<_, CashAccount>(&sql)
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(account)
}

/// Adds `amount` to the account balance.
pub async fn credit(
    conn: &mut SqliteConnection,
    account_id: &str,
    amount: Money,
    context: &AuditContext,
) -> DbResult<CashMovement> {
    apply_movement(conn, account_id, amount, context).await
}

/// Takes `amount` off the account balance. Balances may go negative.
pub async fn debit(
    conn: &mut SqliteConnection,
    account_id: &str,
    amount: Money,
    context: &AuditContext,
) -> DbResult<CashMovement> {
    apply_movement(conn, account_id, -amount, context).await
}

/// Applies a signed delta and logs it.
pub async fn apply_movement(
    conn: &mut SqliteConnection,
    account_id: &str,
    delta: Money,
    context: &AuditContext,
) -> DbResult<CashMovement> {
    let now = Utc::now();

    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE cash_accounts
        SET
            current_balance_cents = current_balance_cents + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING current_balance_cents
        "#,
    )
    .bind(account_id)
    .bind(delta.cents())
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let new_balance =
        new_balance.ok_or_else(|| CoreError::CashAccountNotFound(account_id.to_string()))?;

    let movement = CashMovement {
        id: Uuid::new_v4().to_string(),
        cash_account_id: account_id.to_string(),
        user_id: context.user_id.clone(),
        amount_cents: delta.cents(),
        old_balance_cents: new_balance - delta.cents(),
        new_balance_cents: new_balance,
        reference_id: context.reference_id.clone(),
        reference_type: context.reference_type,
        reason: context.reason.clone(),
        created_at: now,
    };

    debug!(
        account_id = %account_id,
        amount = %delta,
        old_balance = movement.old_balance_cents,
        new_balance,
        reference_id = ?movement.reference_id,
        "Cash balance changed"
    );

    sqlx::query(
        r#"
        INSERT INTO cash_movements (
            id, cash_account_id, user_id, amount_cents,
            old_balance_cents, new_balance_cents,
            reference_id, reference_type, reason, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.cash_account_id)
    .bind(&movement.user_id)
    .bind(movement.amount_cents)
    .bind(movement.old_balance_cents)
    .bind(movement.new_balance_cents)
    .bind(&movement.reference_id)
    .bind(movement.reference_type)
    .bind(&movement.reason)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(movement)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cash accounts.
#[derive(Debug, Clone)]
pub struct CashAccountRepository {
    pool: SqlitePool,
}

impl CashAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashAccountRepository { pool }
    }

    /// Creates an account. A non-zero opening balance is booked as a
    /// manual movement so the log sums to the balance from day one.
    pub async fn create(
        &self,
        branch_id: &str,
        name: &str,
        opening_balance: Money,
        user_id: &str,
    ) -> DbResult<CashAccount> {
        validate_account_name(name).map_err(CoreError::from)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        debug!(id = %id, branch_id = %branch_id, name = %name, "Creating cash account");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cash_accounts (id, branch_id, name, current_balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(branch_id)
        .bind(name.trim())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if !opening_balance.is_zero() {
            let ctx = AuditContext::manual(user_id, "Opening balance");
            apply_movement(&mut *tx, &id, opening_balance, &ctx).await?;
        }

        let account = find_account(&mut *tx, &id)
            .await?
            .ok_or_else(|| CoreError::CashAccountNotFound(id.clone()))?;

        tx.commit().await?;

        Ok(account)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashAccount>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE id = ?1");
        let account = sqlx::query_as::<_, CashAccount>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    /// Accounts of a branch, by name.
    pub async fn list(&self, branch_id: &str) -> DbResult<Vec<CashAccount>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE branch_id = ?1 ORDER BY name");
        let accounts = sqlx::query_as::<_, CashAccount>(&sql)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    /// Movement log of one account, oldest first.
    pub async fn movements(&self, account_id: &str) -> DbResult<Vec<CashMovement>> {
        let sql = format!("{MOVEMENT_SELECT} WHERE cash_account_id = ?1 ORDER BY rowid");
        let rows = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Movements caused by one sale, across all accounts.
    pub async fn movements_for_reference(&self, reference_id: &str) -> DbResult<Vec<CashMovement>> {
        let sql = format!("{MOVEMENT_SELECT} WHERE reference_id = ?1 ORDER BY rowid");
        let rows = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

fn validate_account_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }
    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
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
    use crate::DbError;

    #[tokio::test]
    async fn test_opening_balance_is_logged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let account = db
            .cash_accounts()
            .create("branch-1", "Till 1", Money::from_cents(5_000), "user-1")
            .await
            .unwrap();

        assert_eq!(account.current_balance_cents, 5_000);

        let movements = db.cash_accounts().movements(&account.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].old_balance_cents, 0);
        assert_eq!(movements[0].new_balance_cents, 5_000);
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let account = db
            .cash_accounts()
            .create("branch-1", "Till 1", Money::zero(), "user-1")
            .await
            .unwrap();
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        credit(&mut *tx, &account.id, Money::from_cents(23_600), &ctx).await.unwrap();
        let last = debit(&mut *tx, &account.id, Money::from_cents(3_600), &ctx).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(last.amount_cents, -3_600);
        assert_eq!(last.old_balance_cents, 23_600);
        assert_eq!(last.new_balance_cents, 20_000);

        let stored = db.cash_accounts().get_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance(), Money::from_cents(20_000));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = AuditContext::manual("user-1", "test");

        let mut tx = db.pool().begin().await.unwrap();
        let err = credit(&mut *tx, "nope", Money::from_cents(1), &ctx).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CashAccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_branch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.cash_accounts();
        repo.create("branch-1", "Till 2", Money::zero(), "u").await.unwrap();
        repo.create("branch-1", "Bank", Money::zero(), "u").await.unwrap();
        repo.create("branch-2", "Till 1", Money::zero(), "u").await.unwrap();

        let names: Vec<String> = repo
            .list("branch-1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Bank".to_string(), "Till 2".to_string()]);
    }
}
