//! # Transaction Repository
//!
//! Database operations for sales, refunds, their items and payments, and
//! the checkout audit trail.
//!
//! ## Settlement Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Database Transaction                             │
//! │                                                                         │
//! │  create_sale()                                                          │
//! │     ├── INSERT transactions                                             │
//! │     ├── INSERT transaction_items   (one per cart line)                  │
//! │     ├── INSERT transaction_payments (one per tender)                    │
//! │     └── INSERT journal_outbox      (journal posted later by worker)     │
//! │                                                                         │
//! │  create_refund()                                                        │
//! │     ├── INSERT transactions        (negated amounts, REF- number)       │
//! │     ├── INSERT transaction_items   (negated quantities)                 │
//! │     ├── UPDATE original            (status → refunded)                  │
//! │     └── INSERT journal_outbox                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inventory is deliberately NOT part of these transactions; stock moves are
//! applied afterwards and a failure there lands in `checkout_audit` instead
//! of rolling the sale back.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::outbox;
use kasir_core::{JournalSource, Money, Transaction, TransactionItem, TransactionPayment};

/// Per-tenant fee totals for one calendar month, as consumed by the billing
/// aggregator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeeAggregate {
    pub tenant_id: String,
    pub transaction_count: i64,
    pub total_fee: Money,
}

/// A recorded stock deduction failure from an otherwise successful checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutAuditRow {
    pub id: String,
    pub transaction_id: String,
    pub outlet_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub message: String,
    pub created_at: chrono::DateTime<Utc>,
}

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Persists a completed sale with its items, payments and (optionally)
    /// an outbox row, all in one database transaction.
    pub async fn create_sale(
        &self,
        transaction: &Transaction,
        items: &[TransactionItem],
        payments: &[TransactionPayment],
        journal_source: Option<JournalSource>,
    ) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            number = %transaction.transaction_number,
            "Persisting sale"
        );

        let mut db_tx = self.pool.begin().await?;

        insert_transaction(&mut db_tx, transaction).await?;
        for item in items {
            insert_item(&mut db_tx, item).await?;
        }
        for payment in payments {
            insert_payment(&mut db_tx, payment).await?;
        }
        if let Some(source) = journal_source {
            outbox::insert_with(
                &mut db_tx,
                &Uuid::new_v4().to_string(),
                &transaction.tenant_id,
                &transaction.id,
                source,
            )
            .await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// Persists a refund and flips the original to `refunded`, atomically.
    ///
    /// Fails with `NotFound` if the original is no longer in `completed`
    /// state, which also guards against a concurrent double refund.
    pub async fn create_refund(
        &self,
        refund: &Transaction,
        items: &[TransactionItem],
        original_id: &str,
        journal_source: Option<JournalSource>,
    ) -> DbResult<()> {
        debug!(
            id = %refund.id,
            original = %original_id,
            "Persisting refund"
        );

        let mut db_tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'refunded', updated_at = ?2
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(original_id)
        .bind(Utc::now())
        .execute(&mut *db_tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (completed)", original_id));
        }

        insert_transaction(&mut db_tx, refund).await?;
        for item in items {
            insert_item(&mut db_tx, item).await?;
        }
        if let Some(source) = journal_source {
            outbox::insert_with(
                &mut db_tx,
                &Uuid::new_v4().to_string(),
                &refund.tenant_id,
                &refund.id,
                source,
            )
            .await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, tenant_id, outlet_id, cashier_id, customer_id,
                   transaction_number, kind, status,
                   subtotal, tax_amount, total_amount,
                   payment_channel, rate_bps, rate_flat,
                   gateway_fee, platform_fee, merchant_fee, net_profit,
                   notes, refund_reason, original_transaction_id,
                   reprint_count, last_reprint_at, created_at, updated_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets a transaction by its human-facing number.
    pub async fn find_by_number(&self, number: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, tenant_id, outlet_id, cashier_id, customer_id,
                   transaction_number, kind, status,
                   subtotal, tax_amount, total_amount,
                   payment_channel, rate_bps, rate_flat,
                   gateway_fee, platform_fee, merchant_fee, net_profit,
                   notes, refund_reason, original_transaction_id,
                   reprint_count, last_reprint_at, created_at, updated_at
            FROM transactions
            WHERE transaction_number = ?1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets all items for a transaction.
    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, product_id, variant_id,
                   product_name, variant_name, quantity, unit_price,
                   tax_amount, subtotal, modifiers, notes, created_at
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all payments for a transaction.
    pub async fn payments(&self, transaction_id: &str) -> DbResult<Vec<TransactionPayment>> {
        let payments = sqlx::query_as::<_, TransactionPayment>(
            r#"
            SELECT id, transaction_id, channel, amount, reference, created_at
            FROM transaction_payments
            WHERE transaction_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lists recent transactions for a tenant, newest first, optionally
    /// restricted to one outlet.
    pub async fn list_by_tenant(
        &self,
        tenant_id: &str,
        outlet_id: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, tenant_id, outlet_id, cashier_id, customer_id,
                   transaction_number, kind, status,
                   subtotal, tax_amount, total_amount,
                   payment_channel, rate_bps, rate_flat,
                   gateway_fee, platform_fee, merchant_fee, net_profit,
                   notes, refund_reason, original_transaction_id,
                   reprint_count, last_reprint_at, created_at, updated_at
            FROM transactions
            WHERE tenant_id = ?1 AND (?2 IS NULL OR outlet_id = ?2)
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(tenant_id)
        .bind(outlet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Records a receipt reprint and returns the new count.
    ///
    /// The counter and timestamp are bumped in one statement so concurrent
    /// reprints never lose an increment.
    pub async fn increment_reprint(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            UPDATE transactions
            SET reprint_count = reprint_count + 1,
                last_reprint_at = ?2,
                updated_at = ?2
            WHERE id = ?1
            RETURNING reprint_count
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", id))?;

        Ok(count)
    }

    /// Aggregates merchant fees per tenant for one calendar month.
    ///
    /// Only completed sales with a non-zero fee count; refunds, voids and
    /// zero-fee channels (cash) are excluded. `month` is `YYYY-MM`.
    pub async fn fee_aggregation(&self, month: &str) -> DbResult<Vec<FeeAggregate>> {
        let rows = sqlx::query_as::<_, FeeAggregate>(
            r#"
            SELECT tenant_id,
                   COUNT(*) AS transaction_count,
                   SUM(merchant_fee) AS total_fee
            FROM transactions
            WHERE kind = 'sale'
              AND status = 'completed'
              AND merchant_fee > 0
              AND substr(created_at, 1, 7) = ?1
            GROUP BY tenant_id
            "#,
        )
        .bind(month)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Records a stock deduction that failed during checkout, for later
    /// reconciliation. Never fails the checkout path that calls it.
    pub async fn record_failed_deduction(
        &self,
        transaction_id: &str,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
        message: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO checkout_audit (
                id, transaction_id, outlet_id, product_id, variant_id,
                quantity, message, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(transaction_id)
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the audit trail rows for a transaction.
    pub async fn audit_for_transaction(
        &self,
        transaction_id: &str,
    ) -> DbResult<Vec<CheckoutAuditRow>> {
        let rows = sqlx::query_as::<_, CheckoutAuditRow>(
            r#"
            SELECT id, transaction_id, outlet_id, product_id, variant_id,
                   quantity, message, created_at
            FROM checkout_audit
            WHERE transaction_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

async fn insert_transaction(
    conn: &mut SqliteConnection,
    t: &Transaction,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, tenant_id, outlet_id, cashier_id, customer_id,
            transaction_number, kind, status,
            subtotal, tax_amount, total_amount,
            payment_channel, rate_bps, rate_flat,
            gateway_fee, platform_fee, merchant_fee, net_profit,
            notes, refund_reason, original_transaction_id,
            reprint_count, last_reprint_at, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8,
            ?9, ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16, ?17, ?18,
            ?19, ?20, ?21,
            ?22, ?23, ?24, ?25
        )
        "#,
    )
    .bind(&t.id)
    .bind(&t.tenant_id)
    .bind(&t.outlet_id)
    .bind(&t.cashier_id)
    .bind(&t.customer_id)
    .bind(&t.transaction_number)
    .bind(t.kind)
    .bind(t.status)
    .bind(t.subtotal)
    .bind(t.tax_amount)
    .bind(t.total_amount)
    .bind(t.payment_channel)
    .bind(t.rate_bps)
    .bind(t.rate_flat)
    .bind(t.gateway_fee)
    .bind(t.platform_fee)
    .bind(t.merchant_fee)
    .bind(t.net_profit)
    .bind(&t.notes)
    .bind(&t.refund_reason)
    .bind(&t.original_transaction_id)
    .bind(t.reprint_count)
    .bind(t.last_reprint_at)
    .bind(t.created_at)
    .bind(t.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, variant_id,
            product_name, variant_name, quantity, unit_price,
            tax_amount, subtotal, modifiers, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(&item.variant_id)
    .bind(&item.product_name)
    .bind(&item.variant_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.tax_amount)
    .bind(item.subtotal)
    .bind(&item.modifiers)
    .bind(&item.notes)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &TransactionPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_payments (
            id, transaction_id, channel, amount, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.transaction_id)
    .bind(payment.channel)
    .bind(payment.amount)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kasir_core::{PaymentChannel, TransactionKind, TransactionStatus};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_sale(tenant_id: &str, number: &str, channel: PaymentChannel) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            outlet_id: "outlet-1".to_string(),
            cashier_id: "cashier-1".to_string(),
            customer_id: None,
            transaction_number: number.to_string(),
            kind: TransactionKind::Sale,
            status: TransactionStatus::Completed,
            subtotal: Money::from_minor(25_000),
            tax_amount: Money::from_minor(2_000),
            total_amount: Money::from_minor(27_000),
            payment_channel: channel,
            rate_bps: 120,
            rate_flat: Money::zero(),
            gateway_fee: Money::from_minor(175),
            platform_fee: Money::from_minor(125),
            merchant_fee: Money::from_minor(300),
            net_profit: Money::from_minor(26_700),
            notes: None,
            refund_reason: None,
            original_transaction_id: None,
            reprint_count: 0,
            last_reprint_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_item(transaction_id: &str) -> TransactionItem {
        TransactionItem {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            product_id: "prod-1".to_string(),
            variant_id: None,
            product_name: "Kopi Susu".to_string(),
            variant_name: String::new(),
            quantity: 2,
            unit_price: Money::from_minor(10_000),
            tax_amount: Money::from_minor(2_000),
            subtotal: Money::from_minor(20_000),
            modifiers: "[]".to_string(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_sale_with_outbox() {
        let db = test_db().await;
        let repo = db.transactions();

        let sale = sample_sale("tenant-1", "TXN-20260829-00001", PaymentChannel::Qris);
        let item = sample_item(&sale.id);
        let payment = TransactionPayment {
            id: Uuid::new_v4().to_string(),
            transaction_id: sale.id.clone(),
            channel: PaymentChannel::Qris,
            amount: Money::from_minor(27_000),
            reference: None,
            created_at: Utc::now(),
        };

        repo.create_sale(&sale, &[item], &[payment], Some(JournalSource::PosSale))
            .await
            .unwrap();

        let found = repo.find_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(found.merchant_fee, Money::from_minor(300));
        assert_eq!(found.payment_channel, PaymentChannel::Qris);

        assert_eq!(repo.items(&sale.id).await.unwrap().len(), 1);
        assert_eq!(repo.payments(&sale.id).await.unwrap().len(), 1);

        let outbox_entry = db
            .journal_outbox()
            .by_transaction(&sale.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outbox_entry.source, JournalSource::PosSale);
        assert_eq!(outbox_entry.attempts, 0);
    }

    #[tokio::test]
    async fn test_refund_flips_original_once() {
        let db = test_db().await;
        let repo = db.transactions();

        let sale = sample_sale("tenant-1", "TXN-20260829-00002", PaymentChannel::Cash);
        repo.create_sale(&sale, &[], &[], None).await.unwrap();

        let mut refund = sample_sale("tenant-1", "REF-20260829-00002", PaymentChannel::Cash);
        refund.kind = TransactionKind::Refund;
        refund.subtotal = -sale.subtotal;
        refund.tax_amount = -sale.tax_amount;
        refund.total_amount = -sale.total_amount;
        refund.original_transaction_id = Some(sale.id.clone());

        repo.create_refund(&refund, &[], &sale.id, None)
            .await
            .unwrap();

        let original = repo.find_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(original.status, TransactionStatus::Refunded);

        // Second refund attempt is rejected and nothing is inserted.
        let mut again = refund.clone();
        again.id = Uuid::new_v4().to_string();
        again.transaction_number = "REF-20260829-00003".to_string();
        let err = repo.create_refund(&again, &[], &sale.id, None).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
        assert!(repo.find_by_id(&again.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_reprint() {
        let db = test_db().await;
        let repo = db.transactions();

        let sale = sample_sale("tenant-1", "TXN-20260829-00004", PaymentChannel::Cash);
        repo.create_sale(&sale, &[], &[], None).await.unwrap();

        assert_eq!(repo.increment_reprint(&sale.id).await.unwrap(), 1);
        assert_eq!(repo.increment_reprint(&sale.id).await.unwrap(), 2);

        let found = repo.find_by_id(&sale.id).await.unwrap().unwrap();
        assert!(found.last_reprint_at.is_some());
    }

    #[tokio::test]
    async fn test_fee_aggregation_excludes_refunds_and_cash() {
        let db = test_db().await;
        let repo = db.transactions();

        let month = Utc::now().format("%Y-%m").to_string();

        let qris = sample_sale("tenant-1", "TXN-A", PaymentChannel::Qris);
        repo.create_sale(&qris, &[], &[], None).await.unwrap();

        let mut cash = sample_sale("tenant-1", "TXN-B", PaymentChannel::Cash);
        cash.merchant_fee = Money::zero();
        repo.create_sale(&cash, &[], &[], None).await.unwrap();

        let mut refund = sample_sale("tenant-1", "REF-A", PaymentChannel::Qris);
        refund.kind = TransactionKind::Refund;
        repo.create_sale(&refund, &[], &[], None).await.unwrap();

        let rows = repo.fee_aggregation(&month).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tenant_id, "tenant-1");
        assert_eq!(rows[0].transaction_count, 1);
        assert_eq!(rows[0].total_fee, Money::from_minor(300));
    }

    #[tokio::test]
    async fn test_checkout_audit_trail() {
        let db = test_db().await;
        let repo = db.transactions();

        repo.record_failed_deduction("tx-1", "outlet-1", "prod-1", None, 2, "no stock row")
            .await
            .unwrap();

        let rows = repo.audit_for_transaction("tx-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(rows[0].message, "no stock row");
    }
}
