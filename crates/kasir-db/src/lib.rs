//! # kasir-db: Database Layer for Kasir POS
//!
//! This crate provides database access for the Kasir settlement and ledger
//! subsystem. It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir Settlement Data Flow                       │
//! │                                                                         │
//! │  kasir-engine (CheckoutService, BillingService, ...)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ TransactionRepo│    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ AccountingRepo │    │              │  │   │
//! │  │   │ Foreign keys  │    │ BillingRepo    │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (one per deployment)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/kasir.db")).await?;
//!
//! let sale = db.transactions().find_by_id("...").await?;
//! let pending = db.journal_outbox().pending(50).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::accounting::AccountingRepository;
pub use repository::billing::BillingRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::outbox::JournalOutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::{CheckoutAuditRow, FeeAggregate, TransactionRepository};
