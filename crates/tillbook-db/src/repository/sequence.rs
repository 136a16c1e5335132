//! # Sale Number Allocation
//!
//! Hands out `SAL-<year>-<counter>` inside the caller's transaction.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  next_sale_number(conn, 2026)                                          │
//! │       │                                                                 │
//! │       ├── sale_sequences has a 2026 row?                               │
//! │       │      no  → seed = highest SAL-2026-N already in sales (or 0)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO sale_sequences (year, last_value) VALUES (2026, seed + 1) │
//! │  ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1           │
//! │  RETURNING last_value                        ◄── one atomic statement  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SAL-2026-043                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter row is bumped in the same transaction that inserts the sale,
//! so a rolled-back sale gives its number back. `sales.sale_number` is
//! UNIQUE; a collision from another process surfaces as a retryable
//! [`DbError::UniqueViolation`](crate::DbError::UniqueViolation).

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillbook_core::SaleNumber;

/// Allocates the next sale number for `year`.
pub async fn next_sale_number(conn: &mut SqliteConnection, year: i32) -> DbResult<SaleNumber> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM sale_sequences WHERE year = ?1")
            .bind(year)
            .fetch_optional(&mut *conn)
            .await?;

    let seed = match existing {
        Some(_) => 0,
        None => highest_existing_counter(conn, year).await?,
    };

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sale_sequences (year, last_value) VALUES (?1, ?2 + 1)
        ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(year)
    .bind(seed)
    .fetch_one(&mut *conn)
    .await?;

    let counter = u32::try_from(value).map_err(|_| {
        DbError::Internal(format!("sale number counter for {year} out of range: {value}"))
    })?;
    let number = SaleNumber::new(year, counter);
    debug!(sale_number = %number, "Allocated sale number");

    Ok(number)
}

/// Highest counter among stored `SAL-<year>-…` numbers, 0 when none parse.
///
/// Zero-padded counters sort correctly by (length, text), so the top row
/// is the largest number without scanning the whole year.
async fn highest_existing_counter(conn: &mut SqliteConnection, year: i32) -> DbResult<i64> {
    let pattern = format!("{}%", SaleNumber::year_prefix(year));

    let latest: Option<String> = sqlx::query_scalar(
        r#"
        SELECT sale_number FROM sales
        WHERE sale_number LIKE ?1
        ORDER BY LENGTH(sale_number) DESC, sale_number DESC
        LIMIT 1
        "#,
    )
    .bind(pattern)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(latest
        .and_then(|number| SaleNumber::parse(&number).ok())
        .map(|number| number.counter as i64)
        .unwrap_or(0))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    async fn allocate(db: &Database, year: i32) -> String {
        let mut tx = db.pool().begin().await.unwrap();
        let number = next_sale_number(&mut *tx, year).await.unwrap();
        tx.commit().await.unwrap();
        number.to_string()
    }

    #[tokio::test]
    async fn test_first_number_of_year() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(allocate(&db, 2026).await, "SAL-2026-001");
        assert_eq!(allocate(&db, 2026).await, "SAL-2026-002");
    }

    #[tokio::test]
    async fn test_years_count_independently() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        allocate(&db, 2025).await;
        allocate(&db, 2025).await;
        assert_eq!(allocate(&db, 2026).await, "SAL-2026-001");
        assert_eq!(allocate(&db, 2025).await, "SAL-2025-003");
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_is_reused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        next_sale_number(&mut *tx, 2026).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(allocate(&db, 2026).await, "SAL-2026-001");
    }

    #[tokio::test]
    async fn test_seeded_from_existing_sales() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        for number in ["SAL-2026-041", "SAL-2026-1002", "SAL-2026-999", "SAL-2025-5000"] {
            sqlx::query(
                r#"
                INSERT INTO sales (
                    id, sale_number, sale_date, subtotal_cents, total_cents,
                    balance_cents, payment_status, branch_id, user_id,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, 0, 0, 0, 'QUOTE', 'b', 'u', ?3, ?3)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(number)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();
        }

        assert_eq!(allocate(&db, 2026).await, "SAL-2026-1003");
    }

    #[tokio::test]
    async fn test_counter_past_u32_is_an_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("INSERT INTO sale_sequences (year, last_value) VALUES (2026, ?1)")
            .bind(u32::MAX as i64)
            .execute(db.pool())
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = next_sale_number(&mut *tx, 2026).await.unwrap_err();
        assert!(matches!(err, DbError::Internal(ref msg) if msg.contains("4294967296")));
    }
}
