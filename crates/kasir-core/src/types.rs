//! # Domain Types
//!
//! Core domain types for the settlement and ledger subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌───────────────────┐  ┌────────────────────┐  │
//! │  │   Transaction    │  │  InventoryLevel   │  │  ChartOfAccount    │  │
//! │  │  ──────────────  │  │  ───────────────  │  │  ────────────────  │  │
//! │  │  items, payments │  │  outlet × product │  │  type, sub_type    │  │
//! │  │  fee split       │  │  InventoryMovement│  │  running balance   │  │
//! │  └──────────────────┘  └───────────────────┘  └────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌───────────────────┐                           │
//! │  │  JournalEntry    │  │  TenantBilling    │                           │
//! │  │  + lines         │  │  tenant × month   │                           │
//! │  │  Σdebit==Σcredit │  │  billing status   │                           │
//! │  └──────────────────┘  └───────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! A `Transaction` owns its items and payments (cascade lifetime); a
//! `JournalEntry` owns its lines. `TenantBilling` is owned by the tenant and
//! aggregates many transactions.
//!
//! Every status-like string from the source system is a closed enum here;
//! unknown payment channel strings fold into [`PaymentChannel::Other`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Transaction Enums
// =============================================================================

/// The kind of a POS transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Refund,
    Void,
}

/// The status of a POS transaction.
///
/// Core monetary fields are immutable after creation; only the status (and
/// the reprint counter) may change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Voided,
    Refunded,
}

/// Payment channel of a tender.
///
/// The gateway charges a different Merchant Discount Rate (MDR) per channel,
/// so the channel decides the fee split. Channel strings arriving from the
/// outside are folded into this closed set by [`PaymentChannel::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    Cash,
    CreditCard,
    Qris,
    Ewallet,
    BankTransfer,
    /// Unrecognized channel. Carries no MDR, same as cash.
    Other,
}

impl PaymentChannel {
    /// Parses a channel string case-insensitively.
    ///
    /// The e-wallet brands (gopay, shopeepay, dana, ovo, linkaja) fold into
    /// [`PaymentChannel::Ewallet`]; the virtual-account family folds into
    /// [`PaymentChannel::BankTransfer`]. Anything else is `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "cash" => PaymentChannel::Cash,
            "credit_card" => PaymentChannel::CreditCard,
            "qris" => PaymentChannel::Qris,
            "ewallet" | "gopay" | "shopeepay" | "dana" | "ovo" | "linkaja" => {
                PaymentChannel::Ewallet
            }
            "bank_transfer" | "virtual_account" | "bca_va" | "bni_va" | "bri_va"
            | "mandiri_va" => PaymentChannel::BankTransfer,
            _ => PaymentChannel::Other,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A posted POS transaction (sale, refund, or void).
///
/// Invariants:
/// - `total_amount == subtotal + tax_amount`
/// - for a refund, every monetary field is the negation of the original's
/// - `merchant_fee == gateway_fee + platform_fee`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub outlet_id: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    /// Human-readable number: `TXN-<YYYYMMDD>-<NNNNN>` (refunds use `REF-`).
    pub transaction_number: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    /// Channel of the primary (first) payment; decides the fee split.
    pub payment_channel: PaymentChannel,
    /// Published combined rate in basis points (340 = 3.4%).
    pub rate_bps: i64,
    /// Published combined flat fee component.
    pub rate_flat: Money,
    /// Fee paid to the payment gateway.
    pub gateway_fee: Money,
    /// Fee retained by the platform.
    pub platform_fee: Money,
    /// Combined merchant-facing fee (gateway + platform).
    pub merchant_fee: Money,
    /// `total_amount - merchant_fee`.
    pub net_profit: Money,
    pub notes: Option<String>,
    pub refund_reason: Option<String>,
    /// Set on refunds: the sale being reversed.
    pub original_transaction_id: Option<String>,
    pub reprint_count: i64,
    pub last_reprint_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item in a transaction.
///
/// Uses the snapshot pattern: product and variant names are frozen at sale
/// time so the receipt history survives later catalog edits. Created at
/// checkout, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Variant name at time of sale (frozen, empty when no variant).
    pub variant_name: String,
    pub quantity: i64,
    /// base price + variant additional price + modifier total.
    pub unit_price: Money,
    pub tax_amount: Money,
    pub subtotal: Money,
    /// Selected modifiers as JSON (`[{"name": ..., "price": ...}]`).
    pub modifiers: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payment towards a transaction. Split tender is allowed; the invariant
/// `Σ(payments.amount) >= transaction.total_amount` is checked at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionPayment {
    pub id: String,
    pub transaction_id: String,
    pub channel: PaymentChannel,
    pub amount: Money,
    /// External reference (gateway order id, approval code).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Kind of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Sale,
    Refund,
    Purchase,
    TransferIn,
    TransferOut,
    Adjustment,
}

/// Stock on hand for a product (optionally a variant) at an outlet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub outlet_id: String,
    pub product_id: String,
    /// Empty string when the level tracks the base product.
    pub variant_id: String,
    pub quantity: i64,
    pub min_stock: i64,
}

/// Immutable audit record of a single stock change.
///
/// Append-only: movements are never updated or deleted. Every stock
/// mutation produces exactly one movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: String,
    pub outlet_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub kind: MovementKind,
    /// Signed delta: negative for deductions.
    pub quantity: i64,
    pub reference_type: Option<String>,
    /// The causing transaction, when there is one.
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Accounting
// =============================================================================

/// Double-entry account type. Asset and expense accounts are debit-normal;
/// the rest are credit-normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Whether a debit increases this account's balance.
    pub const fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// Well-known account roles used by automatic journal posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AccountSubType {
    Cash,
    Bank,
    Receivable,
    Payable,
    Inventory,
    Cogs,
    Sales,
    Tax,
}

/// A tenant-scoped account in the chart of accounts.
///
/// `balance` is mutated only by journal posting (atomic increments), never
/// written directly anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ChartOfAccount {
    pub id: String,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub sub_type: Option<AccountSubType>,
    pub is_system: bool,
    pub is_active: bool,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

/// Origin of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum JournalSource {
    PosSale,
    PosRefund,
    Inventory,
    Manual,
}

/// A posted journal entry header.
///
/// Entries are immutable once created; a correction is a new entry, never
/// an edit. `total_debit == total_credit` always (enforced at creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalEntry {
    pub id: String,
    pub tenant_id: String,
    pub outlet_id: Option<String>,
    pub entry_number: String,
    pub entry_date: DateTime<Utc>,
    pub description: String,
    pub source: JournalSource,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub created_at: DateTime<Utc>,
}

/// A debit/credit line in a journal entry. Exactly one of `debit`/`credit`
/// is non-zero in practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalEntryLine {
    pub id: String,
    pub journal_entry_id: String,
    pub account_id: String,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tenant Billing
// =============================================================================

/// Lifecycle of a monthly fee invoice.
///
/// ```text
/// unpaid ──► past_due ──► paid (terminal)
///   │            │
///   │            └──► suspended (manual escalation)
///   ├──► paid (terminal)
///   └──► suspended (manual escalation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    PastDue,
    Suspended,
    Paid,
}

/// Monthly processing-fee invoice for a tenant.
///
/// One row per tenant per calendar month (`MM-YYYY`); the pair is the
/// idempotency key of the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TenantBilling {
    pub id: String,
    pub tenant_id: String,
    /// Format: `MM-YYYY`, e.g. `07-2026`.
    pub billing_month: String,
    pub total_transactions: i64,
    /// Sum of merchant-facing fees over the month.
    pub total_fee: Money,
    /// 10% late penalty, applied when paying after the due day.
    pub penalty_fee: Money,
    pub status: BillingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Journal Outbox
// =============================================================================

/// A pending journal-posting job.
///
/// Written in the same database transaction as the sale/refund it belongs
/// to, then processed by the outbox worker. This replaces fire-and-forget
/// posting: a slow ledger never blocks checkout, and entries are never
/// silently lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalOutboxEntry {
    pub id: String,
    pub tenant_id: String,
    pub transaction_id: String,
    pub source: JournalSource,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the journal was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// Set when posting was skipped (missing system accounts).
    pub skipped_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Catalog (read-side subset)
// =============================================================================

/// Catalog product as seen by checkout pricing resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub base_price: Money,
    /// Flat per-product tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product variant; its price is added on top of the base price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub additional_price: Money,
}

// =============================================================================
// Requests (DTOs)
// =============================================================================

/// An item modifier chosen at the register (e.g. "extra shot", +2_000).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemModifier {
    pub name: String,
    pub price: Money,
}

/// A cart line in a checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItemRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub modifiers: Vec<ItemModifier>,
    pub notes: Option<String>,
}

/// A tender in a checkout request. The channel is a free string here and is
/// folded into [`PaymentChannel`] by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub channel: String,
    pub amount: Money,
    pub reference: Option<String>,
}

/// The checkout contract: a cart plus its tenders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub outlet_id: String,
    pub customer_id: Option<String>,
    pub items: Vec<CheckoutItemRequest>,
    pub payments: Vec<PaymentRequest>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
