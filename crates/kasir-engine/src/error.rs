//! # Engine Error Types
//!
//! One error type for the orchestration layer, wrapping the two layers
//! beneath it. Business rule violations arrive as [`CoreError`]; storage
//! failures as [`DbError`]. Callers that care about a specific rule match
//! on `EngineError::Core(..)`.

use thiserror::Error;

use kasir_core::CoreError;
use kasir_db::DbError;

/// Errors surfaced by the settlement services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation (gate, validation,
    /// insufficient payment, double refund, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Convenience alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether this error should be shown to the cashier as-is (business
    /// rule) rather than as a generic failure.
    pub fn is_business_rule(&self) -> bool {
        matches!(self, EngineError::Core(_))
    }
}
