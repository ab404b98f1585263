//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Settlement rule violations                     │
//! │  └── ValidationError  - Malformed checkout input                       │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kasir-engine errors                                                   │
//! │  └── EngineError      - Core or Db, surfaced to the caller             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derives, never manual `Display` impls
//! 2. Context in the message (transaction id, amounts)
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Settlement rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown (or inactive) product referenced by a cart line. The whole
    /// checkout aborts; nothing is persisted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Unknown variant for a known product.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Unknown transaction referenced by a refund or reprint.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Unknown billing invoice referenced by a payment.
    #[error("Billing invoice not found: {0}")]
    BillingNotFound(String),

    /// The billing gate blocked checkout. The message is user-facing and
    /// distinguishes "pay now" from "suspended".
    #[error("{message}")]
    BillingBlocked { message: String },

    /// The tendered payments do not cover the transaction total.
    #[error("payment amount is less than total: paid {paid}, total {total}")]
    InsufficientPayment { total: i64, paid: i64 },

    /// Refund of a transaction that was already refunded.
    #[error("transaction already refunded: {0}")]
    AlreadyRefunded(String),

    /// Payment of a billing invoice that is already paid (terminal state).
    #[error("billing is already paid: {0}")]
    BillingAlreadyPaid(String),

    /// A journal entry whose debits and credits do not match. This is the
    /// core financial correctness contract and is checked defensively at
    /// every posting.
    #[error("unbalanced journal entry: debit {debit}, credit {credit}")]
    UnbalancedJournal { debit: i64, credit: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Malformed checkout input, rejected before any persistence.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("cart has no items")]
    EmptyItems,

    #[error("checkout has no payments")]
    EmptyPayments,

    #[error("cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("quantity must be positive, got {quantity}")]
    NonPositiveQuantity { quantity: i64 },

    #[error("quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("payment amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            total: 27_000,
            paid: 20_000,
        };
        assert_eq!(
            err.to_string(),
            "payment amount is less than total: paid 20000, total 27000"
        );

        let err = CoreError::UnbalancedJournal {
            debit: 27_000,
            credit: 25_000,
        };
        assert_eq!(
            err.to_string(),
            "unbalanced journal entry: debit 27000, credit 25000"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyItems.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
