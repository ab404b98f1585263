//! # Billing Repository
//!
//! Monthly tenant invoices for accumulated merchant fees.
//!
//! `(tenant_id, billing_month)` is unique; the aggregator leans on that
//! with `INSERT OR IGNORE` so re-running a month is a no-op for tenants
//! already invoiced.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{BillingStatus, Money, TenantBilling};

/// Repository for tenant billing database operations.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: SqlitePool,
}

impl BillingRepository {
    /// Creates a new BillingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillingRepository { pool }
    }

    /// Inserts a billing if none exists yet for `(tenant, month)`.
    ///
    /// Returns `true` when a row was inserted, `false` when the month was
    /// already invoiced for this tenant.
    pub async fn insert_if_absent(&self, billing: &TenantBilling) -> DbResult<bool> {
        debug!(
            tenant_id = %billing.tenant_id,
            month = %billing.billing_month,
            fee = billing.total_fee.minor(),
            "Inserting tenant billing"
        );

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO tenant_billings (
                id, tenant_id, billing_month, total_transactions,
                total_fee, penalty_fee, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&billing.id)
        .bind(&billing.tenant_id)
        .bind(&billing.billing_month)
        .bind(billing.total_transactions)
        .bind(billing.total_fee)
        .bind(billing.penalty_fee)
        .bind(billing.status)
        .bind(billing.created_at)
        .bind(billing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets a billing by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<TenantBilling>> {
        let billing = sqlx::query_as::<_, TenantBilling>(
            r#"
            SELECT id, tenant_id, billing_month, total_transactions,
                   total_fee, penalty_fee, status, created_at, updated_at
            FROM tenant_billings
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(billing)
    }

    /// Lists a tenant's billings, newest first.
    pub async fn list_by_tenant(&self, tenant_id: &str) -> DbResult<Vec<TenantBilling>> {
        let billings = sqlx::query_as::<_, TenantBilling>(
            r#"
            SELECT id, tenant_id, billing_month, total_transactions,
                   total_fee, penalty_fee, status, created_at, updated_at
            FROM tenant_billings
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(billings)
    }

    /// Lists a tenant's billings not yet paid, oldest first. This is the
    /// input to the checkout billing gate.
    pub async fn outstanding(&self, tenant_id: &str) -> DbResult<Vec<TenantBilling>> {
        let billings = sqlx::query_as::<_, TenantBilling>(
            r#"
            SELECT id, tenant_id, billing_month, total_transactions,
                   total_fee, penalty_fee, status, created_at, updated_at
            FROM tenant_billings
            WHERE tenant_id = ?1 AND status != 'paid'
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(billings)
    }

    /// Settles a billing: records the penalty (possibly zero) and marks it
    /// paid. Only an unsettled billing can be paid.
    pub async fn mark_paid(&self, id: &str, penalty_fee: Money) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_billings
            SET status = 'paid', penalty_fee = ?2, updated_at = ?3
            WHERE id = ?1 AND status != 'paid'
            "#,
        )
        .bind(id)
        .bind(penalty_fee)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Billing (unpaid)", id));
        }

        Ok(())
    }

    /// Moves a billing into a dunning status (`past_due` or `suspended`).
    pub async fn set_status(&self, id: &str, status: BillingStatus) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_billings
            SET status = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Billing", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn billing(tenant_id: &str, month: &str, fee: i64) -> TenantBilling {
        let now = Utc::now();
        TenantBilling {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            billing_month: month.to_string(),
            total_transactions: 12,
            total_fee: Money::from_minor(fee),
            penalty_fee: Money::zero(),
            status: BillingStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_per_month() {
        let db = test_db().await;
        let repo = db.billing();

        let first = billing("t1", "07-2026", 34_000);
        assert!(repo.insert_if_absent(&first).await.unwrap());

        // Same month again, even with a different fee, is ignored.
        let rerun = billing("t1", "07-2026", 99_000);
        assert!(!repo.insert_if_absent(&rerun).await.unwrap());

        let all = repo.list_by_tenant("t1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_fee, Money::from_minor(34_000));

        // A different month inserts fine.
        assert!(repo.insert_if_absent(&billing("t1", "08-2026", 12_000)).await.unwrap());
    }

    #[tokio::test]
    async fn test_pay_once() {
        let db = test_db().await;
        let repo = db.billing();

        let b = billing("t1", "07-2026", 34_000);
        repo.insert_if_absent(&b).await.unwrap();

        repo.mark_paid(&b.id, Money::from_minor(3_400)).await.unwrap();

        let paid = repo.find_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(paid.status, BillingStatus::Paid);
        assert_eq!(paid.penalty_fee, Money::from_minor(3_400));

        assert!(matches!(
            repo.mark_paid(&b.id, Money::zero()).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(repo.outstanding("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outstanding_includes_dunning_statuses() {
        let db = test_db().await;
        let repo = db.billing();

        let b = billing("t1", "06-2026", 10_000);
        repo.insert_if_absent(&b).await.unwrap();
        repo.set_status(&b.id, BillingStatus::PastDue).await.unwrap();

        let outstanding = repo.outstanding("t1").await.unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].status, BillingStatus::PastDue);
    }
}
