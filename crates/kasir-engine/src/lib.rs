//! # kasir-engine: Settlement Orchestration for Kasir POS
//!
//! Coordinates the flows that span multiple aggregates: checkout, refunds,
//! monthly MDR billing, and the background journal posting worker.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Kasir Settlement Engine                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  kasir-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  CheckoutService     gate → price → tender → persist → deduct   │   │
//! │  │  BillingService      monthly aggregation, penalties, dunning    │   │
//! │  │  InventoryService    receiving, opname, thresholds              │   │
//! │  │  AccountingService   COA seeding, reports                       │   │
//! │  │  JournalOutboxWorker posts balanced journals in the background  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │        │ rules                                │ storage                 │
//! │        ▼                                      ▼                         │
//! │  ┌───────────────┐                     ┌───────────────┐               │
//! │  │  kasir-core   │                     │   kasir-db    │               │
//! │  │  (pure)       │                     │   (SQLite)    │               │
//! │  └───────────────┘                     └───────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`checkout`] - Checkout, refund, reprint orchestration
//! - [`billing`] - Monthly invoice generation and settlement
//! - [`inventory`] - Manual stock operations
//! - [`accounting`] - Chart-of-accounts seeding and reports
//! - [`outbox`] - Journal posting worker
//! - [`config`] - Engine tunables
//! - [`error`] - Engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accounting;
pub mod billing;
pub mod checkout;
pub mod config;
pub mod error;
pub mod inventory;
pub mod outbox;

// =============================================================================
// Re-exports
// =============================================================================

pub use accounting::{AccountingService, BalanceSheet, ProfitLoss, TrialBalanceRow};
pub use billing::BillingService;
pub use checkout::CheckoutService;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use inventory::InventoryService;
pub use outbox::{JournalOutboxWorker, JournalOutboxWorkerHandle};
