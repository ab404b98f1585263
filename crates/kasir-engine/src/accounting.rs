//! # Accounting Service
//!
//! Tenant chart-of-accounts lifecycle and read-only financial reports.
//! Journal posting itself lives in the outbox worker; this service only
//! seeds and reads.

use std::sync::Arc;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineResult;
use kasir_core::{
    AccountSubType, AccountType, ChartOfAccount, JournalEntry, JournalEntryLine, Money,
};
use kasir_db::Database;

// =============================================================================
// Reports
// =============================================================================

/// One trial balance row: an account and the side its balance sits on.
#[derive(Debug, Clone)]
pub struct TrialBalanceRow {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit: Money,
    pub credit: Money,
}

/// Profit & loss: revenue vs expense balances.
#[derive(Debug, Clone)]
pub struct ProfitLoss {
    pub revenue: Money,
    pub expenses: Money,
    pub net_profit: Money,
}

/// Balance sheet: asset, liability and equity totals.
#[derive(Debug, Clone)]
pub struct BalanceSheet {
    pub assets: Money,
    pub liabilities: Money,
    pub equity: Money,
}

// =============================================================================
// Accounting Service
// =============================================================================

/// Service for chart-of-accounts management and reports.
#[derive(Clone)]
pub struct AccountingService {
    db: Arc<Database>,
}

impl AccountingService {
    /// Creates a new AccountingService.
    pub fn new(db: Arc<Database>) -> Self {
        AccountingService { db }
    }

    /// Seeds the default chart of accounts for a new tenant.
    ///
    /// The cash, sales and tax accounts carry the subtypes the journal
    /// worker resolves automatic postings against.
    pub async fn init_default_accounts(&self, tenant_id: &str) -> EngineResult<()> {
        info!(tenant_id = %tenant_id, "Seeding default chart of accounts");

        use AccountSubType::*;
        use AccountType::*;

        let defaults: &[(&str, &str, AccountType, Option<AccountSubType>)] = &[
            // Assets
            ("1000", "Aset", Asset, None),
            ("1100", "Kas", Asset, Some(Cash)),
            ("1200", "Bank", Asset, Some(Bank)),
            ("1300", "Piutang Usaha", Asset, Some(Receivable)),
            ("1400", "Persediaan", Asset, Some(Inventory)),
            // Liabilities
            ("2000", "Kewajiban", Liability, None),
            ("2100", "Hutang Usaha", Liability, Some(Payable)),
            ("2200", "Hutang Pajak", Liability, Some(Tax)),
            // Equity
            ("3000", "Modal", Equity, None),
            ("3100", "Modal Disetor", Equity, None),
            ("3200", "Laba Ditahan", Equity, None),
            // Revenue
            ("4000", "Pendapatan", Revenue, None),
            ("4100", "Penjualan", Revenue, Some(Sales)),
            ("4200", "Pendapatan Lain-lain", Revenue, None),
            // Expenses
            ("5000", "Beban", Expense, None),
            ("5100", "Harga Pokok Penjualan", Expense, Some(Cogs)),
            ("5200", "Beban Gaji", Expense, None),
            ("5300", "Beban Sewa", Expense, None),
            ("5400", "Beban Operasional", Expense, None),
        ];

        let now = Utc::now();
        for (code, name, account_type, sub_type) in defaults {
            let account = ChartOfAccount {
                id: Uuid::new_v4().to_string(),
                tenant_id: tenant_id.to_string(),
                code: code.to_string(),
                name: name.to_string(),
                account_type: *account_type,
                sub_type: *sub_type,
                is_system: true,
                is_active: true,
                balance: Money::zero(),
                created_at: now,
            };
            self.db.accounting().create_account(&account).await?;
        }

        Ok(())
    }

    /// Creates a custom (non-system) account.
    pub async fn create_account(&self, account: &ChartOfAccount) -> EngineResult<()> {
        self.db.accounting().create_account(account).await?;
        Ok(())
    }

    /// Lists a tenant's accounts ordered by code.
    pub async fn accounts(&self, tenant_id: &str) -> EngineResult<Vec<ChartOfAccount>> {
        Ok(self.db.accounting().accounts_by_tenant(tenant_id).await?)
    }

    /// Lists a tenant's journal entries, newest first.
    pub async fn journals(&self, tenant_id: &str, limit: i64) -> EngineResult<Vec<JournalEntry>> {
        Ok(self.db.accounting().journals_by_tenant(tenant_id, limit).await?)
    }

    /// Gets the lines of a journal entry.
    pub async fn journal_lines(&self, entry_id: &str) -> EngineResult<Vec<JournalEntryLine>> {
        Ok(self.db.accounting().lines(entry_id).await?)
    }

    /// Builds a trial balance from current account balances. Each account's
    /// balance lands on its normal side.
    pub async fn trial_balance(&self, tenant_id: &str) -> EngineResult<Vec<TrialBalanceRow>> {
        let accounts = self.db.accounting().accounts_by_tenant(tenant_id).await?;

        let rows = accounts
            .into_iter()
            .map(|a| {
                let (debit, credit) = if a.account_type.is_debit_normal() {
                    (a.balance, Money::zero())
                } else {
                    (Money::zero(), a.balance)
                };
                TrialBalanceRow {
                    code: a.code,
                    name: a.name,
                    account_type: a.account_type,
                    debit,
                    credit,
                }
            })
            .collect();

        Ok(rows)
    }

    /// Profit & loss projection from current balances.
    pub async fn profit_loss(&self, tenant_id: &str) -> EngineResult<ProfitLoss> {
        let accounts = self.db.accounting().accounts_by_tenant(tenant_id).await?;

        let revenue: Money = accounts
            .iter()
            .filter(|a| a.account_type == AccountType::Revenue)
            .map(|a| a.balance)
            .sum();
        let expenses: Money = accounts
            .iter()
            .filter(|a| a.account_type == AccountType::Expense)
            .map(|a| a.balance)
            .sum();

        Ok(ProfitLoss {
            revenue,
            expenses,
            net_profit: revenue - expenses,
        })
    }

    /// Balance sheet projection from current balances.
    pub async fn balance_sheet(&self, tenant_id: &str) -> EngineResult<BalanceSheet> {
        let accounts = self.db.accounting().accounts_by_tenant(tenant_id).await?;

        let sum_of = |t: AccountType| -> Money {
            accounts
                .iter()
                .filter(|a| a.account_type == t)
                .map(|a| a.balance)
                .sum()
        };

        Ok(BalanceSheet {
            assets: sum_of(AccountType::Asset),
            liabilities: sum_of(AccountType::Liability),
            equity: sum_of(AccountType::Equity),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_core::journal::SystemAccounts;
    use kasir_db::DbConfig;

    async fn service() -> AccountingService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AccountingService::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_seeding_resolves_system_accounts() {
        let svc = service().await;
        svc.init_default_accounts("t1").await.unwrap();

        let accounts = svc.accounts("t1").await.unwrap();
        assert_eq!(accounts.len(), 19);
        // Ordered by code.
        assert_eq!(accounts[0].code, "1000");

        let system = SystemAccounts::resolve(&accounts);
        assert!(system.cash.is_some());
        assert!(system.sales.is_some());
        assert!(system.tax.is_some());
        assert!(system.can_post(Money::from_minor(2_000)));
    }

    #[tokio::test]
    async fn test_empty_reports() {
        let svc = service().await;
        svc.init_default_accounts("t1").await.unwrap();

        let pl = svc.profit_loss("t1").await.unwrap();
        assert!(pl.revenue.is_zero());
        assert!(pl.net_profit.is_zero());

        let bs = svc.balance_sheet("t1").await.unwrap();
        assert!(bs.assets.is_zero());

        let tb = svc.trial_balance("t1").await.unwrap();
        assert_eq!(tb.len(), 19);
        assert!(tb.iter().all(|r| r.debit.is_zero() && r.credit.is_zero()));
    }
}
