//! # Billing Service
//!
//! Monthly MDR invoice generation and settlement.
//!
//! ## Billing Month Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tenant Billing Lifecycle                           │
//! │                                                                         │
//! │  generate_monthly_billings()  (start of month, for the previous one)    │
//! │     └── SUM(merchant_fee) per tenant → INSERT OR IGNORE                 │
//! │                                                                         │
//! │  UNPAID ──(pay before day 7)──────────────▶ PAID                        │
//! │     │                                        ▲                          │
//! │     └──(day passes 7)── PAST_DUE ──(pay +10% penalty)                   │
//! │                            │                                            │
//! │                            └──(a month of non-payment)──▶ SUSPENDED     │
//! │                                                              │          │
//! │                                          (pay +10% penalty)──┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `PAID` is terminal. Generation is idempotent per tenant × month; a rerun
//! silently skips tenants already invoiced.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::EngineResult;
use kasir_core::billing::{late_penalty, previous_month, BILLING_DUE_DAY};
use kasir_core::{BillingStatus, CoreError, Money, TenantBilling};
use kasir_db::Database;

// =============================================================================
// Billing Service
// =============================================================================

/// Service for monthly tenant billing.
#[derive(Clone)]
pub struct BillingService {
    db: Arc<Database>,
}

impl BillingService {
    /// Creates a new BillingService.
    pub fn new(db: Arc<Database>) -> Self {
        BillingService { db }
    }

    /// Generates invoices for the previous calendar month.
    ///
    /// Returns the number of invoices actually created. Tenants with no
    /// fee-carrying sales in the month get no invoice at all.
    pub async fn generate_monthly_billings(&self) -> EngineResult<usize> {
        self.generate_for(Utc::now().date_naive()).await
    }

    /// Generation pinned to an explicit "today", for deterministic tests.
    pub async fn generate_for(&self, today: NaiveDate) -> EngineResult<usize> {
        let (year, month, month_key) = previous_month(today);
        let sql_month = format!("{:04}-{:02}", year, month);

        info!(month = %month_key, "Generating monthly billings");

        let aggregates = self.db.transactions().fee_aggregation(&sql_month).await?;

        let mut created = 0;
        for aggregate in aggregates {
            let now = Utc::now();
            let billing = TenantBilling {
                id: Uuid::new_v4().to_string(),
                tenant_id: aggregate.tenant_id.clone(),
                billing_month: month_key.clone(),
                total_transactions: aggregate.transaction_count,
                total_fee: aggregate.total_fee,
                penalty_fee: Money::zero(),
                status: BillingStatus::Unpaid,
                created_at: now,
                updated_at: now,
            };

            if self.db.billing().insert_if_absent(&billing).await? {
                created += 1;
            } else {
                debug!(
                    tenant_id = %aggregate.tenant_id,
                    month = %month_key,
                    "Billing already exists, skipping"
                );
            }
        }

        info!(created = created, "Monthly billing generation finished");
        Ok(created)
    }

    /// Settles an invoice. Late settlement (after the month's due day)
    /// carries a 10% penalty on the fee total.
    pub async fn pay_billing(
        &self,
        tenant_id: &str,
        billing_id: &str,
    ) -> EngineResult<TenantBilling> {
        self.pay_billing_on(tenant_id, billing_id, Utc::now().date_naive())
            .await
    }

    /// Settlement pinned to an explicit "today", for deterministic tests.
    pub async fn pay_billing_on(
        &self,
        tenant_id: &str,
        billing_id: &str,
        today: NaiveDate,
    ) -> EngineResult<TenantBilling> {
        let billing = self
            .db
            .billing()
            .find_by_id(billing_id)
            .await?
            .filter(|b| b.tenant_id == tenant_id)
            .ok_or_else(|| CoreError::BillingNotFound(billing_id.to_string()))?;

        if billing.status == BillingStatus::Paid {
            return Err(CoreError::BillingAlreadyPaid(billing_id.to_string()).into());
        }

        let penalty = if today.day() > BILLING_DUE_DAY {
            late_penalty(billing.total_fee)
        } else {
            Money::zero()
        };

        self.db.billing().mark_paid(billing_id, penalty).await?;

        info!(
            billing_id = %billing_id,
            month = %billing.billing_month,
            penalty = penalty.minor(),
            "Billing settled"
        );

        let paid = self
            .db
            .billing()
            .find_by_id(billing_id)
            .await?
            .ok_or_else(|| CoreError::BillingNotFound(billing_id.to_string()))?;

        Ok(paid)
    }

    /// Lists a tenant's invoices, newest first.
    pub async fn billings(&self, tenant_id: &str) -> EngineResult<Vec<TenantBilling>> {
        Ok(self.db.billing().list_by_tenant(tenant_id).await?)
    }

    /// Marks an overdue invoice as past due (dunning step).
    pub async fn mark_past_due(&self, billing_id: &str) -> EngineResult<()> {
        self.db
            .billing()
            .set_status(billing_id, BillingStatus::PastDue)
            .await?;
        Ok(())
    }

    /// Suspends the tenant's invoice after prolonged non-payment.
    pub async fn suspend(&self, billing_id: &str) -> EngineResult<()> {
        self.db
            .billing()
            .set_status(billing_id, BillingStatus::Suspended)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use kasir_db::DbConfig;

    async fn service() -> (Arc<Database>, BillingService) {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        (db.clone(), BillingService::new(db))
    }

    async fn seed_billing(db: &Database, tenant_id: &str, fee: i64) -> TenantBilling {
        let now = Utc::now();
        let billing = TenantBilling {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            billing_month: "07-2026".to_string(),
            total_transactions: 4,
            total_fee: Money::from_minor(fee),
            penalty_fee: Money::zero(),
            status: BillingStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };
        db.billing().insert_if_absent(&billing).await.unwrap();
        billing
    }

    #[tokio::test]
    async fn test_pay_on_time_has_no_penalty() {
        let (db, svc) = service().await;
        let billing = seed_billing(&db, "t1", 50_000).await;

        let day5 = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let paid = svc.pay_billing_on("t1", &billing.id, day5).await.unwrap();

        assert_eq!(paid.status, BillingStatus::Paid);
        assert!(paid.penalty_fee.is_zero());
    }

    #[tokio::test]
    async fn test_late_payment_adds_ten_percent() {
        let (db, svc) = service().await;
        let billing = seed_billing(&db, "t1", 50_000).await;

        let day10 = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        let paid = svc.pay_billing_on("t1", &billing.id, day10).await.unwrap();

        assert_eq!(paid.penalty_fee, Money::from_minor(5_000));
        assert_eq!(paid.status, BillingStatus::Paid);
    }

    #[tokio::test]
    async fn test_paid_is_terminal() {
        let (db, svc) = service().await;
        let billing = seed_billing(&db, "t1", 50_000).await;

        let day5 = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        svc.pay_billing_on("t1", &billing.id, day5).await.unwrap();

        let again = svc.pay_billing_on("t1", &billing.id, day5).await;
        assert!(matches!(
            again,
            Err(EngineError::Core(CoreError::BillingAlreadyPaid(_)))
        ));
    }

    #[tokio::test]
    async fn test_wrong_tenant_cannot_pay() {
        let (db, svc) = service().await;
        let billing = seed_billing(&db, "t1", 50_000).await;

        let day5 = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let result = svc.pay_billing_on("t2", &billing.id, day5).await;
        assert!(matches!(
            result,
            Err(EngineError::Core(CoreError::BillingNotFound(_)))
        ));
    }
}
