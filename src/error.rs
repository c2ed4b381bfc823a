//! Ledger error taxonomy
//!
//! One crate-level error enum covers every way an operation can be refused.
//! Refusals happen before any mutation, so an `Err` always means the ledger
//! is exactly as it was.

use thiserror::Error;

use crate::models::Money;

/// Result alias used by every ledger operation
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a ledger operation was refused or failed
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Bad operation input: non-positive amount, malformed numeric text,
    /// missing required field
    #[error("invalid input: {0}")]
    Validation(String),

    /// More money was requested than the relevant bound allows
    #[error("insufficient funds in envelope '{envelope}': requested {requested}, available {available}")]
    InsufficientFunds {
        envelope: String,
        requested: Money,
        available: Money,
    },

    /// The per-month envelope cap was hit
    #[error("envelope limit reached: at most {limit} envelopes per month")]
    LimitExceeded { limit: usize },

    /// Split legs do not add up to the transaction total
    #[error("split legs total {actual}, transaction amount is {expected}")]
    SplitMismatch { expected: Money, actual: Money },

    /// The operation would leave records contradicting each other
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    #[error("no such {entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate {entity}: {id}")]
    Duplicate { entity: &'static str, id: String },

    /// Persistence failures (lock poisoning, unreadable or unwritable files)
    #[error("storage: {0}")]
    Storage(String),

    #[error("i/o: {0}")]
    Io(String),

    #[error("json: {0}")]
    Json(String),
}

impl LedgerError {
    fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn envelope_not_found(id: impl Into<String>) -> Self {
        Self::not_found("envelope", id)
    }

    pub fn transaction_not_found(id: impl Into<String>) -> Self {
        Self::not_found("transaction", id)
    }

    pub fn income_not_found(id: impl Into<String>) -> Self {
        Self::not_found("income", id)
    }

    pub fn goal_not_found(id: impl Into<String>) -> Self {
        Self::not_found("savings goal", id)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
