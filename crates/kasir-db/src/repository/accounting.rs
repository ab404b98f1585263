//! # Accounting Repository
//!
//! Chart of accounts and double-entry journal posting.
//!
//! ## Posting Rules
//! - A journal entry's lines must balance (total debit == total credit)
//!   or the insert is rejected before anything is written.
//! - Entry header, lines, and running balance updates commit in one
//!   database transaction.
//! - Balances follow the normal-balance convention: asset and expense
//!   accounts grow with debits, everything else grows with credits. A
//!   refund's mirrored entry therefore walks each balance back without
//!   special-casing.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{ChartOfAccount, JournalEntry, JournalEntryLine, Money};

/// Repository for accounting database operations.
#[derive(Debug, Clone)]
pub struct AccountingRepository {
    pool: SqlitePool,
}

impl AccountingRepository {
    /// Creates a new AccountingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountingRepository { pool }
    }

    /// Inserts an account.
    pub async fn create_account(&self, account: &ChartOfAccount) -> DbResult<()> {
        debug!(code = %account.code, name = %account.name, "Creating account");

        sqlx::query(
            r#"
            INSERT INTO chart_of_accounts (
                id, tenant_id, code, name, account_type, sub_type,
                is_system, is_active, balance, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type)
        .bind(account.sub_type)
        .bind(account.is_system)
        .bind(account.is_active)
        .bind(account.balance)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an account by tenant and code.
    pub async fn find_by_code(
        &self,
        tenant_id: &str,
        code: &str,
    ) -> DbResult<Option<ChartOfAccount>> {
        let account = sqlx::query_as::<_, ChartOfAccount>(
            r#"
            SELECT id, tenant_id, code, name, account_type, sub_type,
                   is_system, is_active, balance, created_at
            FROM chart_of_accounts
            WHERE tenant_id = ?1 AND code = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists a tenant's accounts ordered by code.
    pub async fn accounts_by_tenant(&self, tenant_id: &str) -> DbResult<Vec<ChartOfAccount>> {
        let accounts = sqlx::query_as::<_, ChartOfAccount>(
            r#"
            SELECT id, tenant_id, code, name, account_type, sub_type,
                   is_system, is_active, balance, created_at
            FROM chart_of_accounts
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY code
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Posts a journal entry: header, lines, and balance updates in one
    /// database transaction.
    ///
    /// Rejects unbalanced entries and lines referencing unknown accounts;
    /// in both cases nothing is written.
    pub async fn create_journal(
        &self,
        entry: &JournalEntry,
        lines: &[JournalEntryLine],
    ) -> DbResult<()> {
        let total_debit: Money = lines.iter().map(|l| l.debit).sum();
        let total_credit: Money = lines.iter().map(|l| l.credit).sum();
        if total_debit != total_credit {
            return Err(DbError::UnbalancedJournal {
                debit: total_debit.minor(),
                credit: total_credit.minor(),
            });
        }

        debug!(
            entry_number = %entry.entry_number,
            debit = total_debit.minor(),
            "Posting journal entry"
        );

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, tenant_id, outlet_id, entry_number, entry_date,
                description, source, reference_type, reference_id,
                total_debit, total_credit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.outlet_id)
        .bind(&entry.entry_number)
        .bind(entry.entry_date)
        .bind(&entry.description)
        .bind(entry.source)
        .bind(&entry.reference_type)
        .bind(&entry.reference_id)
        .bind(total_debit)
        .bind(total_credit)
        .bind(entry.created_at)
        .execute(&mut *db_tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO journal_entry_lines (
                    id, journal_entry_id, account_id, description,
                    debit, credit, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&line.id)
            .bind(&entry.id)
            .bind(&line.account_id)
            .bind(&line.description)
            .bind(line.debit)
            .bind(line.credit)
            .bind(line.created_at)
            .execute(&mut *db_tx)
            .await?;

            // Normal-balance rule: debit-normal accounts (asset, expense)
            // grow by debit - credit, the rest by credit - debit.
            let result = sqlx::query(
                r#"
                UPDATE chart_of_accounts
                SET balance = balance + CASE
                    WHEN account_type IN ('asset', 'expense') THEN ?2 - ?3
                    ELSE ?3 - ?2
                END
                WHERE id = ?1
                "#,
            )
            .bind(&line.account_id)
            .bind(line.debit)
            .bind(line.credit)
            .execute(&mut *db_tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Account", &line.account_id));
            }
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// Lists a tenant's journal entries, newest first.
    pub async fn journals_by_tenant(
        &self,
        tenant_id: &str,
        limit: i64,
    ) -> DbResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, tenant_id, outlet_id, entry_number, entry_date,
                   description, source, reference_type, reference_id,
                   total_debit, total_credit, created_at
            FROM journal_entries
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Gets the journal entry posted for a given reference (e.g. a
    /// transaction id), if any.
    pub async fn journal_by_reference(
        &self,
        reference_id: &str,
    ) -> DbResult<Option<JournalEntry>> {
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, tenant_id, outlet_id, entry_number, entry_date,
                   description, source, reference_type, reference_id,
                   total_debit, total_credit, created_at
            FROM journal_entries
            WHERE reference_id = ?1
            "#,
        )
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets the lines of a journal entry.
    pub async fn lines(&self, journal_entry_id: &str) -> DbResult<Vec<JournalEntryLine>> {
        let lines = sqlx::query_as::<_, JournalEntryLine>(
            r#"
            SELECT id, journal_entry_id, account_id, description,
                   debit, credit, created_at
            FROM journal_entry_lines
            WHERE journal_entry_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(journal_entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use kasir_core::{AccountSubType, AccountType, JournalSource};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn account(
        tenant_id: &str,
        code: &str,
        name: &str,
        account_type: AccountType,
        sub_type: Option<AccountSubType>,
    ) -> ChartOfAccount {
        ChartOfAccount {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            sub_type,
            is_system: true,
            is_active: true,
            balance: Money::zero(),
            created_at: Utc::now(),
        }
    }

    fn entry(tenant_id: &str, number: &str) -> JournalEntry {
        let now = Utc::now();
        JournalEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            outlet_id: Some("outlet-1".to_string()),
            entry_number: number.to_string(),
            entry_date: now,
            description: "POS sale".to_string(),
            source: JournalSource::PosSale,
            reference_type: Some("transaction".to_string()),
            reference_id: Some("tx-1".to_string()),
            total_debit: Money::zero(),
            total_credit: Money::zero(),
            created_at: now,
        }
    }

    fn line(account_id: &str, debit: i64, credit: i64) -> JournalEntryLine {
        JournalEntryLine {
            id: Uuid::new_v4().to_string(),
            journal_entry_id: String::new(),
            account_id: account_id.to_string(),
            description: String::new(),
            debit: Money::from_minor(debit),
            credit: Money::from_minor(credit),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unique_code_per_tenant() {
        let db = test_db().await;
        let repo = db.accounting();

        let cash = account("t1", "1000", "Kas", AccountType::Asset, Some(AccountSubType::Cash));
        repo.create_account(&cash).await.unwrap();

        let dup = account("t1", "1000", "Kas lagi", AccountType::Asset, None);
        assert!(matches!(
            repo.create_account(&dup).await,
            Err(DbError::UniqueViolation { .. })
        ));

        // Same code under another tenant is fine.
        let other = account("t2", "1000", "Kas", AccountType::Asset, None);
        repo.create_account(&other).await.unwrap();
    }

    #[tokio::test]
    async fn test_balanced_journal_updates_balances() {
        let db = test_db().await;
        let repo = db.accounting();

        let cash = account("t1", "1000", "Kas", AccountType::Asset, Some(AccountSubType::Cash));
        let sales = account("t1", "4000", "Penjualan", AccountType::Revenue, Some(AccountSubType::Sales));
        let tax = account("t1", "2100", "Hutang Pajak", AccountType::Liability, Some(AccountSubType::Tax));
        repo.create_account(&cash).await.unwrap();
        repo.create_account(&sales).await.unwrap();
        repo.create_account(&tax).await.unwrap();

        let e = entry("t1", "JRN-SALE-1");
        let lines = vec![
            line(&cash.id, 27_000, 0),
            line(&sales.id, 0, 25_000),
            line(&tax.id, 0, 2_000),
        ];
        repo.create_journal(&e, &lines).await.unwrap();

        let cash = repo.find_by_code("t1", "1000").await.unwrap().unwrap();
        let sales = repo.find_by_code("t1", "4000").await.unwrap().unwrap();
        let tax = repo.find_by_code("t1", "2100").await.unwrap().unwrap();
        assert_eq!(cash.balance, Money::from_minor(27_000));
        assert_eq!(sales.balance, Money::from_minor(25_000));
        assert_eq!(tax.balance, Money::from_minor(2_000));

        assert_eq!(repo.lines(&e.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_mirrored_entry_walks_balances_back() {
        let db = test_db().await;
        let repo = db.accounting();

        let cash = account("t1", "1000", "Kas", AccountType::Asset, None);
        let sales = account("t1", "4000", "Penjualan", AccountType::Revenue, None);
        repo.create_account(&cash).await.unwrap();
        repo.create_account(&sales).await.unwrap();

        let sale = entry("t1", "JRN-SALE-1");
        repo.create_journal(&sale, &[line(&cash.id, 10_000, 0), line(&sales.id, 0, 10_000)])
            .await
            .unwrap();

        let mut refund = entry("t1", "JRN-REFUND-1");
        refund.reference_id = Some("tx-2".to_string());
        repo.create_journal(&refund, &[line(&cash.id, 0, 10_000), line(&sales.id, 10_000, 0)])
            .await
            .unwrap();

        let cash = repo.find_by_code("t1", "1000").await.unwrap().unwrap();
        let sales = repo.find_by_code("t1", "4000").await.unwrap().unwrap();
        assert_eq!(cash.balance, Money::zero());
        assert_eq!(sales.balance, Money::zero());
    }

    #[tokio::test]
    async fn test_unbalanced_journal_rejected() {
        let db = test_db().await;
        let repo = db.accounting();

        let cash = account("t1", "1000", "Kas", AccountType::Asset, None);
        repo.create_account(&cash).await.unwrap();

        let e = entry("t1", "JRN-BAD");
        let result = repo.create_journal(&e, &[line(&cash.id, 10_000, 0)]).await;
        assert!(matches!(result, Err(DbError::UnbalancedJournal { .. })));

        assert!(repo.journals_by_tenant("t1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_rolls_back() {
        let db = test_db().await;
        let repo = db.accounting();

        let cash = account("t1", "1000", "Kas", AccountType::Asset, None);
        repo.create_account(&cash).await.unwrap();

        let e = entry("t1", "JRN-MISSING");
        let result = repo
            .create_journal(&e, &[line(&cash.id, 5_000, 0), line("nope", 0, 5_000)])
            .await;
        assert!(result.is_err());

        // Nothing committed, cash untouched.
        let cash = repo.find_by_code("t1", "1000").await.unwrap().unwrap();
        assert_eq!(cash.balance, Money::zero());
        assert!(repo.journals_by_tenant("t1", 10).await.unwrap().is_empty());
    }
}
