//! # Repository Layer
//!
//! Data access repositories, one per aggregate:
//!
//! - [`product`] - Catalog reads used by checkout pricing
//! - [`transaction`] - Sales, refunds, items, payments, checkout audit
//! - [`inventory`] - Stock levels and the movement ledger
//! - [`accounting`] - Chart of accounts and journal posting
//! - [`billing`] - Monthly tenant invoices
//! - [`outbox`] - Pending journal postings
//!
//! Each repository owns a clone of the shared `SqlitePool`. Operations that
//! must be atomic (sale + outbox row, journal + balance updates, movement +
//! level update) run inside a single database transaction.

pub mod accounting;
pub mod billing;
pub mod inventory;
pub mod outbox;
pub mod product;
pub mod transaction;
