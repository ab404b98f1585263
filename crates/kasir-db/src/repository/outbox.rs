//! # Journal Outbox Repository
//!
//! Pending journal postings, written in the same database transaction as
//! the sale or refund they describe. The posting worker drains this table:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Outbox Row Lifecycle                            │
//! │                                                                     │
//! │   checkout ──▶ PENDING ──▶ posted_at set     (journal written)      │
//! │                   │                                                 │
//! │                   ├──────▶ attempts += 1     (transient failure)    │
//! │                   │                                                 │
//! │                   └──────▶ skipped_at set    (unpostable, gave up)  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never deleted; a posted or skipped row is the audit record of
//! what the worker decided.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{JournalOutboxEntry, JournalSource};

/// Repository for journal outbox operations.
#[derive(Debug, Clone)]
pub struct JournalOutboxRepository {
    pool: SqlitePool,
}

impl JournalOutboxRepository {
    /// Creates a new JournalOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JournalOutboxRepository { pool }
    }

    /// Gets pending entries in FIFO order.
    pub async fn pending(&self, limit: i64) -> DbResult<Vec<JournalOutboxEntry>> {
        let entries = sqlx::query_as::<_, JournalOutboxEntry>(
            r#"
            SELECT id, tenant_id, transaction_id, source,
                   attempts, last_error, created_at, posted_at, skipped_at
            FROM journal_outbox
            WHERE posted_at IS NULL AND skipped_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts pending entries.
    pub async fn pending_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM journal_outbox
            WHERE posted_at IS NULL AND skipped_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks an entry as posted.
    pub async fn mark_posted(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Outbox entry posted");

        let result = sqlx::query(
            r#"
            UPDATE journal_outbox
            SET posted_at = ?2, last_error = NULL
            WHERE id = ?1 AND posted_at IS NULL AND skipped_at IS NULL
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry (pending)", id));
        }

        Ok(())
    }

    /// Records a failed posting attempt.
    ///
    /// Increments the attempt counter and stores the error; the entry stays
    /// pending and will be retried on the next worker tick.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<i64> {
        let attempts: i64 = sqlx::query_scalar(
            r#"
            UPDATE journal_outbox
            SET attempts = attempts + 1, last_error = ?2
            WHERE id = ?1 AND posted_at IS NULL AND skipped_at IS NULL
            RETURNING attempts
            "#,
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Outbox entry (pending)", id))?;

        Ok(attempts)
    }

    /// Permanently skips an entry (unpostable or retries exhausted).
    pub async fn mark_skipped(&self, id: &str, reason: &str) -> DbResult<()> {
        debug!(id = %id, reason = %reason, "Outbox entry skipped");

        let result = sqlx::query(
            r#"
            UPDATE journal_outbox
            SET skipped_at = ?2, last_error = ?3
            WHERE id = ?1 AND posted_at IS NULL AND skipped_at IS NULL
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry (pending)", id));
        }

        Ok(())
    }

    /// Gets the outbox entry for a transaction, if one exists.
    pub async fn by_transaction(
        &self,
        transaction_id: &str,
    ) -> DbResult<Option<JournalOutboxEntry>> {
        let entry = sqlx::query_as::<_, JournalOutboxEntry>(
            r#"
            SELECT id, tenant_id, transaction_id, source,
                   attempts, last_error, created_at, posted_at, skipped_at
            FROM journal_outbox
            WHERE transaction_id = ?1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}

/// Inserts an outbox row on an open connection, so callers can enqueue it
/// inside the same database transaction as the sale it describes.
pub(crate) async fn insert_with(
    conn: &mut SqliteConnection,
    id: &str,
    tenant_id: &str,
    transaction_id: &str,
    source: JournalSource,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO journal_outbox (
            id, tenant_id, transaction_id, source, attempts, created_at
        ) VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(transaction_id)
    .bind(source)
    .bind(chrono::Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
