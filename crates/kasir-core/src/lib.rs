//! # kasir-core: Pure Settlement Logic for Kasir POS
//!
//! This crate is the **heart** of the settlement subsystem. It contains
//! all financial business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Kasir POS Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  HTTP layer (out of scope)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain structured requests              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                kasir-engine (orchestration)                     │   │
//! │  │    checkout, refund, billing aggregator, outbox worker          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   fees    │  │  billing  │  │  journal  │  │   │
//! │  │   │   Money   │  │ MDR split │  │   gate    │  │  Σd == Σc │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Transaction, ChartOfAccount, TenantBilling, …)
//! - [`money`] - Integer money (no floating point!)
//! - [`fees`] - Per-channel MDR fee split
//! - [`billing`] - Billing gate decision and month arithmetic
//! - [`journal`] - Balanced journal construction
//! - [`validation`] - Checkout request validation
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod fees;
pub mod journal;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fees::{compute_fee, FeeBreakdown};
pub use money::Money;
pub use types::*;
