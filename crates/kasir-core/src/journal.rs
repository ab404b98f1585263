//! # Journal Construction
//!
//! Pure construction of balanced double-entry journal drafts from posted
//! transactions. The drafts are persisted (and account balances applied)
//! by the database layer; nothing here touches I/O.
//!
//! ## Sale posting
//! ```text
//! ┌──────────────────────────┬──────────┬──────────┐
//! │ account                  │ debit    │ credit   │
//! ├──────────────────────────┼──────────┼──────────┤
//! │ Cash (asset)             │ total    │          │
//! │ Sales (revenue)          │          │ subtotal │
//! │ Tax payable (liability)  │          │ tax      │  (only when tax > 0)
//! └──────────────────────────┴──────────┴──────────┘
//! ```
//! A refund posts the mirror image (credit cash, debit sales/tax).
//!
//! `Σdebit == Σcredit` is THE financial correctness contract of this
//! subsystem; [`JournalDraft::validate`] enforces it defensively even
//! though both constructors balance by construction.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{AccountSubType, ChartOfAccount, JournalSource, Transaction};

// =============================================================================
// System Accounts
// =============================================================================

/// The tenant's well-known accounts resolved by subtype.
///
/// Cash and sales are required for posting; tax is only needed when the
/// transaction carries tax.
#[derive(Debug, Clone, Default)]
pub struct SystemAccounts {
    pub cash: Option<String>,
    pub sales: Option<String>,
    pub tax: Option<String>,
}

impl SystemAccounts {
    /// Picks the cash/sales/tax accounts out of a tenant's chart of
    /// accounts by subtype.
    pub fn resolve(accounts: &[ChartOfAccount]) -> Self {
        let mut resolved = SystemAccounts::default();
        for account in accounts {
            match account.sub_type {
                Some(AccountSubType::Cash) => resolved.cash = Some(account.id.clone()),
                Some(AccountSubType::Sales) => resolved.sales = Some(account.id.clone()),
                Some(AccountSubType::Tax) => resolved.tax = Some(account.id.clone()),
                _ => {}
            }
        }
        resolved
    }

    /// Whether automatic posting is possible for a transaction with the
    /// given tax amount.
    pub fn can_post(&self, tax: Money) -> bool {
        self.cash.is_some() && self.sales.is_some() && (tax.is_zero() || self.tax.is_some())
    }
}

// =============================================================================
// Journal Draft
// =============================================================================

/// One unpersisted debit/credit leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub account_id: String,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
}

impl DraftLine {
    fn debit(account_id: &str, amount: Money, description: &str) -> Self {
        DraftLine {
            account_id: account_id.to_string(),
            description: description.to_string(),
            debit: amount,
            credit: Money::zero(),
        }
    }

    fn credit(account_id: &str, amount: Money, description: &str) -> Self {
        DraftLine {
            account_id: account_id.to_string(),
            description: description.to_string(),
            debit: Money::zero(),
            credit: amount,
        }
    }
}

/// An unpersisted, balanced journal entry.
#[derive(Debug, Clone)]
pub struct JournalDraft {
    pub tenant_id: String,
    pub outlet_id: Option<String>,
    pub entry_number: String,
    pub entry_date: DateTime<Utc>,
    pub description: String,
    pub source: JournalSource,
    pub reference_id: String,
    pub lines: Vec<DraftLine>,
}

impl JournalDraft {
    pub fn total_debit(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credit(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }

    /// Rejects unbalanced or empty drafts.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::UnbalancedJournal { debit: 0, credit: 0 });
        }
        let (debit, credit) = (self.total_debit(), self.total_credit());
        if debit != credit {
            return Err(CoreError::UnbalancedJournal {
                debit: debit.minor(),
                credit: credit.minor(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Builds the journal draft for a completed sale.
///
/// Returns `None` when the tenant's system accounts are missing; the
/// caller records the posting as skipped.
pub fn sale_journal(accounts: &SystemAccounts, tx: &Transaction) -> Option<JournalDraft> {
    if !accounts.can_post(tx.tax_amount) {
        return None;
    }
    let cash = accounts.cash.as_deref()?;
    let sales = accounts.sales.as_deref()?;

    let mut lines = vec![
        DraftLine::debit(cash, tx.total_amount, "Cash received"),
        DraftLine::credit(sales, tx.subtotal, "Sales revenue"),
    ];
    if !tx.tax_amount.is_zero() {
        let tax = accounts.tax.as_deref()?;
        lines.push(DraftLine::credit(tax, tx.tax_amount, "Tax payable"));
    }

    Some(JournalDraft {
        tenant_id: tx.tenant_id.clone(),
        outlet_id: Some(tx.outlet_id.clone()),
        entry_number: format!("JRN-SALE-{}", tx.transaction_number),
        entry_date: tx.created_at,
        description: format!("Auto journal for sale {}", tx.transaction_number),
        source: JournalSource::PosSale,
        reference_id: tx.id.clone(),
        lines,
    })
}

/// Builds the compensating journal draft for a refund.
///
/// The refund transaction stores negated amounts; the entry posts their
/// absolute values on the opposite legs so the original sale's posting is
/// exactly reversed.
pub fn refund_journal(accounts: &SystemAccounts, tx: &Transaction) -> Option<JournalDraft> {
    let total = tx.total_amount.abs();
    let subtotal = tx.subtotal.abs();
    let tax = tx.tax_amount.abs();

    if !accounts.can_post(tax) {
        return None;
    }
    let cash = accounts.cash.as_deref()?;
    let sales = accounts.sales.as_deref()?;

    let mut lines = vec![
        DraftLine::credit(cash, total, "Cash refunded"),
        DraftLine::debit(sales, subtotal, "Sales reversal"),
    ];
    if !tax.is_zero() {
        let tax_account = accounts.tax.as_deref()?;
        lines.push(DraftLine::debit(tax_account, tax, "Tax reversal"));
    }

    Some(JournalDraft {
        tenant_id: tx.tenant_id.clone(),
        outlet_id: Some(tx.outlet_id.clone()),
        entry_number: format!("JRN-REFUND-{}", tx.transaction_number),
        entry_date: tx.created_at,
        description: format!("Auto journal for refund {}", tx.transaction_number),
        source: JournalSource::PosRefund,
        reference_id: tx.id.clone(),
        lines,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentChannel, TransactionKind, TransactionStatus};

    fn accounts() -> SystemAccounts {
        SystemAccounts {
            cash: Some("acc-cash".to_string()),
            sales: Some("acc-sales".to_string()),
            tax: Some("acc-tax".to_string()),
        }
    }

    fn sale(subtotal: i64, tax: i64) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: "tx-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            outlet_id: "outlet-1".to_string(),
            cashier_id: "user-1".to_string(),
            customer_id: None,
            transaction_number: "TXN-20260815-00042".to_string(),
            kind: TransactionKind::Sale,
            status: TransactionStatus::Completed,
            subtotal: Money::from_minor(subtotal),
            tax_amount: Money::from_minor(tax),
            total_amount: Money::from_minor(subtotal + tax),
            payment_channel: PaymentChannel::Qris,
            rate_bps: 120,
            rate_flat: Money::zero(),
            gateway_fee: Money::from_minor(175),
            platform_fee: Money::from_minor(125),
            merchant_fee: Money::from_minor(300),
            net_profit: Money::from_minor(subtotal + tax - 300),
            notes: None,
            refund_reason: None,
            original_transaction_id: None,
            reprint_count: 0,
            last_reprint_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_journal_is_balanced() {
        let draft = sale_journal(&accounts(), &sale(25_000, 2_000)).unwrap();
        draft.validate().unwrap();
        assert_eq!(draft.total_debit().minor(), 27_000);
        assert_eq!(draft.total_credit().minor(), 27_000);
        assert_eq!(draft.lines.len(), 3);
        assert_eq!(draft.entry_number, "JRN-SALE-TXN-20260815-00042");
    }

    #[test]
    fn test_sale_journal_without_tax_has_two_lines() {
        let draft = sale_journal(&accounts(), &sale(5_000, 0)).unwrap();
        draft.validate().unwrap();
        assert_eq!(draft.lines.len(), 2);
    }

    #[test]
    fn test_sale_journal_skipped_without_system_accounts() {
        let mut missing = accounts();
        missing.sales = None;
        assert!(sale_journal(&missing, &sale(25_000, 2_000)).is_none());
    }

    #[test]
    fn test_tax_sale_skipped_without_tax_account() {
        let mut missing = accounts();
        missing.tax = None;
        assert!(sale_journal(&missing, &sale(25_000, 2_000)).is_none());
        // Tax-free sales still post without a tax account.
        assert!(sale_journal(&missing, &sale(5_000, 0)).is_some());
    }

    #[test]
    fn test_refund_journal_mirrors_sale() {
        let mut refund_tx = sale(25_000, 2_000);
        refund_tx.kind = TransactionKind::Refund;
        refund_tx.subtotal = -refund_tx.subtotal;
        refund_tx.tax_amount = -refund_tx.tax_amount;
        refund_tx.total_amount = -refund_tx.total_amount;

        let draft = refund_journal(&accounts(), &refund_tx).unwrap();
        draft.validate().unwrap();
        assert_eq!(draft.total_debit().minor(), 27_000);
        assert_eq!(draft.total_credit().minor(), 27_000);

        // Cash leg is a credit on refund.
        let cash_line = draft
            .lines
            .iter()
            .find(|l| l.account_id == "acc-cash")
            .unwrap();
        assert_eq!(cash_line.credit.minor(), 27_000);
        assert!(cash_line.debit.is_zero());
    }

    #[test]
    fn test_validate_rejects_unbalanced() {
        let mut draft = sale_journal(&accounts(), &sale(25_000, 2_000)).unwrap();
        draft.lines.pop();
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, CoreError::UnbalancedJournal { .. }));
    }
}
