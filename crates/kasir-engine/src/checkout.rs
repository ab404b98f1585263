//! # Checkout Orchestrator
//!
//! The synchronous settlement flow for one register call.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Flow                                    │
//! │                                                                         │
//! │  1. VALIDATE       cart shape, quantities, payment amounts              │
//! │  2. BILLING GATE   outstanding MDR invoices may block the terminal      │
//! │  3. PRICE          base + variant + modifiers, per-line tax             │
//! │  4. TENDER         Σpayments must cover the total                       │
//! │  5. PERSIST        transaction + items + payments + outbox row          │
//! │                    (one database transaction)                           │
//! │  6. DEDUCT STOCK   non-fatal; failures logged + audited                 │
//! │  7. JOURNAL        posted later by the outbox worker                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1-4 write nothing; the first failure aborts the call. After step 5
//! the sale is committed and nothing can unwind it; steps 6-7 are
//! best-effort with their own audit trails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use kasir_core::{
    compute_fee, validation, CheckoutRequest, CoreError, Money, MovementKind, PaymentChannel,
    Transaction, TransactionItem, TransactionKind, TransactionPayment, TransactionStatus,
};
use kasir_core::billing::evaluate_gate;
use kasir_db::Database;

// =============================================================================
// Checkout Service
// =============================================================================

/// Orchestrates checkout, refund and reprint.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<Database>,
}

/// A fully priced cart line, ready to snapshot into a transaction item.
struct PricedLine {
    product_id: String,
    variant_id: Option<String>,
    product_name: String,
    variant_name: String,
    quantity: i64,
    unit_price: Money,
    tax_amount: Money,
    subtotal: Money,
    modifiers_json: String,
    notes: Option<String>,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(db: Arc<Database>) -> Self {
        CheckoutService { db }
    }

    /// Runs one checkout and returns the completed transaction.
    pub async fn checkout(
        &self,
        tenant_id: &str,
        cashier_id: &str,
        request: CheckoutRequest,
    ) -> EngineResult<Transaction> {
        // 1. Shape validation, before any I/O.
        validation::validate_checkout(&request).map_err(CoreError::from)?;

        // 2. Billing gate.
        let bills = self.db.billing().outstanding(tenant_id).await?;
        if let kasir_core::billing::GateDecision::Blocked { message, .. } =
            evaluate_gate(&bills, Utc::now().date_naive())
        {
            return Err(CoreError::BillingBlocked {
                message: message.to_string(),
            }
            .into());
        }

        // 3. Pricing. Prices are snapshotted here; later catalog edits do
        //    not rewrite history.
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            lines.push(self.price_line(item).await?);
        }

        let subtotal: Money = lines.iter().map(|l| l.subtotal).sum();
        let tax_amount: Money = lines.iter().map(|l| l.tax_amount).sum();
        let total_amount = subtotal + tax_amount;

        // 4. Tender sufficiency.
        let paid: Money = request.payments.iter().map(|p| p.amount).sum();
        if paid < total_amount {
            return Err(CoreError::InsufficientPayment {
                total: total_amount.minor(),
                paid: paid.minor(),
            }
            .into());
        }

        // Merchant fee is charged on the pre-tax subtotal; tax is passed
        // through to the tax authority, not to the gateway.
        let channel = PaymentChannel::parse(&request.payments[0].channel);
        let fee = compute_fee(channel, subtotal);

        let now = Utc::now();
        let transaction_id = Uuid::new_v4().to_string();
        let transaction = Transaction {
            id: transaction_id.clone(),
            tenant_id: tenant_id.to_string(),
            outlet_id: request.outlet_id.clone(),
            cashier_id: cashier_id.to_string(),
            customer_id: request.customer_id.clone(),
            transaction_number: generate_transaction_number("TXN"),
            kind: TransactionKind::Sale,
            status: TransactionStatus::Completed,
            subtotal,
            tax_amount,
            total_amount,
            payment_channel: channel,
            rate_bps: fee.rate_bps as i64,
            rate_flat: fee.rate_flat,
            gateway_fee: fee.gateway_fee,
            platform_fee: fee.platform_fee,
            merchant_fee: fee.combined(),
            net_profit: total_amount - fee.combined(),
            notes: request.notes.clone(),
            refund_reason: None,
            original_transaction_id: None,
            reprint_count: 0,
            last_reprint_at: None,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<TransactionItem> = lines
            .iter()
            .map(|l| TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.clone(),
                product_id: l.product_id.clone(),
                variant_id: l.variant_id.clone(),
                product_name: l.product_name.clone(),
                variant_name: l.variant_name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                tax_amount: l.tax_amount,
                subtotal: l.subtotal,
                modifiers: l.modifiers_json.clone(),
                notes: l.notes.clone(),
                created_at: now,
            })
            .collect();

        let payments: Vec<TransactionPayment> = request
            .payments
            .iter()
            .map(|p| TransactionPayment {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.clone(),
                channel: PaymentChannel::parse(&p.channel),
                amount: p.amount,
                reference: p.reference.clone(),
                created_at: now,
            })
            .collect();

        // 5. Persist sale + journal outbox row atomically.
        self.db
            .transactions()
            .create_sale(
                &transaction,
                &items,
                &payments,
                Some(kasir_core::JournalSource::PosSale),
            )
            .await?;

        info!(
            transaction_number = %transaction.transaction_number,
            total = total_amount.minor(),
            fee = transaction.merchant_fee.minor(),
            "Checkout completed"
        );

        // 6. Stock deduction, after the sale is committed. A failure here
        //    must not void a sale the customer already paid for.
        for line in &lines {
            self.deduct_line(&transaction, line, cashier_id).await;
        }

        Ok(transaction)
    }

    /// Refunds a completed sale in full.
    pub async fn refund(
        &self,
        tenant_id: &str,
        cashier_id: &str,
        transaction_id: &str,
        reason: &str,
    ) -> EngineResult<Transaction> {
        let original = self
            .db
            .transactions()
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        if original.tenant_id != tenant_id {
            return Err(CoreError::TransactionNotFound(transaction_id.to_string()).into());
        }
        if original.status == TransactionStatus::Refunded {
            return Err(CoreError::AlreadyRefunded(transaction_id.to_string()).into());
        }
        if original.kind != TransactionKind::Sale
            || original.status != TransactionStatus::Completed
        {
            return Err(CoreError::TransactionNotFound(transaction_id.to_string()).into());
        }

        let original_items = self.db.transactions().items(transaction_id).await?;

        let now = Utc::now();
        let refund_id = Uuid::new_v4().to_string();
        // Amounts are negated; fees are not clawed back from the gateway,
        // so the fee fields stay zero.
        let refund = Transaction {
            id: refund_id.clone(),
            tenant_id: original.tenant_id.clone(),
            outlet_id: original.outlet_id.clone(),
            cashier_id: cashier_id.to_string(),
            customer_id: original.customer_id.clone(),
            transaction_number: generate_transaction_number("REF"),
            kind: TransactionKind::Refund,
            status: TransactionStatus::Completed,
            subtotal: -original.subtotal,
            tax_amount: -original.tax_amount,
            total_amount: -original.total_amount,
            payment_channel: original.payment_channel,
            rate_bps: 0,
            rate_flat: Money::zero(),
            gateway_fee: Money::zero(),
            platform_fee: Money::zero(),
            merchant_fee: Money::zero(),
            net_profit: -original.total_amount,
            notes: None,
            refund_reason: Some(reason.to_string()),
            original_transaction_id: Some(original.id.clone()),
            reprint_count: 0,
            last_reprint_at: None,
            created_at: now,
            updated_at: now,
        };

        let refund_items: Vec<TransactionItem> = original_items
            .iter()
            .map(|item| TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: refund_id.clone(),
                quantity: -item.quantity,
                subtotal: -item.subtotal,
                tax_amount: -item.tax_amount,
                created_at: now,
                ..item.clone()
            })
            .collect();

        self.db
            .transactions()
            .create_refund(
                &refund,
                &refund_items,
                &original.id,
                Some(kasir_core::JournalSource::PosRefund),
            )
            .await
            .map_err(|e| match e {
                // The flip of the original raced another refund.
                kasir_db::DbError::NotFound { .. } => {
                    CoreError::AlreadyRefunded(transaction_id.to_string()).into()
                }
                other => crate::error::EngineError::Db(other),
            })?;

        info!(
            refund_number = %refund.transaction_number,
            original = %original.transaction_number,
            "Refund completed"
        );

        // Restore stock per original line; same non-fatal policy as
        // checkout deduction.
        for item in &original_items {
            let result = self
                .db
                .inventory()
                .adjust_stock(
                    &original.outlet_id,
                    &item.product_id,
                    item.variant_id.as_deref(),
                    item.quantity,
                    MovementKind::Refund,
                    Some("transaction"),
                    Some(&refund.id),
                    Some(cashier_id),
                )
                .await;
            if let Err(e) = result {
                warn!(
                    error = %e,
                    product_id = %item.product_id,
                    "Stock restore failed during refund"
                );
            }
        }

        Ok(refund)
    }

    /// Records a receipt reprint and returns the transaction with its
    /// updated counter.
    pub async fn reprint(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .increment_reprint(transaction_id)
            .await
            .map_err(|e| match e {
                kasir_db::DbError::NotFound { .. } => {
                    CoreError::TransactionNotFound(transaction_id.to_string()).into()
                }
                other => crate::error::EngineError::Db(other),
            })?;

        let transaction = self
            .db
            .transactions()
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        Ok(transaction)
    }

    /// Gets one transaction.
    pub async fn transaction(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()).into())
    }

    /// Lists a tenant's recent transactions, optionally for one outlet.
    pub async fn transactions(
        &self,
        tenant_id: &str,
        outlet_id: Option<&str>,
        limit: i64,
    ) -> EngineResult<Vec<Transaction>> {
        Ok(self
            .db
            .transactions()
            .list_by_tenant(tenant_id, outlet_id, limit)
            .await?)
    }

    /// Prices one cart line against the catalog.
    async fn price_line(
        &self,
        item: &kasir_core::CheckoutItemRequest,
    ) -> EngineResult<PricedLine> {
        let product = self
            .db
            .products()
            .find_by_id(&item.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let (variant_price, variant_name) = match &item.variant_id {
            Some(variant_id) => {
                let variant = self
                    .db
                    .products()
                    .find_variant(&item.product_id, variant_id)
                    .await?
                    .ok_or_else(|| CoreError::VariantNotFound(variant_id.clone()))?;
                (variant.additional_price, variant.name)
            }
            None => (Money::zero(), String::new()),
        };

        let modifier_price: Money = item.modifiers.iter().map(|m| m.price).sum();
        let unit_price = product.base_price + variant_price + modifier_price;
        let line_subtotal = unit_price * item.quantity;
        let tax_bps = u32::try_from(product.tax_rate_bps).unwrap_or(0);
        let line_tax = line_subtotal.percentage_bps(tax_bps);

        let modifiers_json =
            serde_json::to_string(&item.modifiers).unwrap_or_else(|_| "[]".to_string());

        Ok(PricedLine {
            product_id: product.id,
            variant_id: item.variant_id.clone(),
            product_name: product.name,
            variant_name,
            quantity: item.quantity,
            unit_price,
            tax_amount: line_tax,
            subtotal: line_subtotal,
            modifiers_json,
            notes: item.notes.clone(),
        })
    }

    /// Deducts stock for one committed line. Failures are warn-logged and
    /// written to the checkout audit table, never propagated.
    async fn deduct_line(&self, transaction: &Transaction, line: &PricedLine, cashier_id: &str) {
        let result = self
            .db
            .inventory()
            .adjust_stock(
                &transaction.outlet_id,
                &line.product_id,
                line.variant_id.as_deref(),
                -line.quantity,
                MovementKind::Sale,
                Some("transaction"),
                Some(&transaction.id),
                Some(cashier_id),
            )
            .await;

        if let Err(e) = result {
            warn!(
                error = %e,
                transaction_id = %transaction.id,
                product_id = %line.product_id,
                "Stock deduction failed after committed checkout"
            );

            let audit = self
                .db
                .transactions()
                .record_failed_deduction(
                    &transaction.id,
                    &transaction.outlet_id,
                    &line.product_id,
                    line.variant_id.as_deref(),
                    line.quantity,
                    &e.to_string(),
                )
                .await;
            if let Err(audit_err) = audit {
                warn!(error = %audit_err, "Failed to record deduction audit row");
            }
        }
    }
}

/// Generates a transaction number: `<prefix>-<YYYYMMDD>-<5 digits>`.
///
/// The sequence is timestamp-derived, matching the receipt numbering used
/// at the registers; uniqueness is ultimately enforced by the database.
fn generate_transaction_number(prefix: &str) -> String {
    let now = Utc::now();
    let seq = (now.timestamp_micros() % 100_000) as u32;
    format!("{}-{}-{:05}", prefix, now.format("%Y%m%d"), seq)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_number_format() {
        let number = generate_transaction_number("TXN");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 5);
    }

    #[test]
    fn test_refund_number_prefix() {
        assert!(generate_transaction_number("REF").starts_with("REF-"));
    }
}
