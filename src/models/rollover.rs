//! Rollover configuration and history
//!
//! An envelope's rollover strategy decides how much of its unspent balance is
//! carried into the next month. Every carry-over performed by a month advance
//! is recorded as an immutable history entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::EnvelopeId;
use super::money::Money;
use super::month::MonthKey;

/// How an envelope's unspent balance carries into the next month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RolloverStrategy {
    /// Nothing carries over; the envelope is not copied into the next month
    #[default]
    None,

    /// The full unspent balance carries over
    Full,

    /// A percentage (0-100) of the unspent balance carries over
    Percentage { percent: u8 },

    /// The unspent balance carries over up to a fixed ceiling
    Capped { max: Money },
}

impl RolloverStrategy {
    /// Validate the strategy parameters
    pub fn validate(&self) -> Result<(), RolloverValidationError> {
        match self {
            Self::Percentage { percent } if *percent > 100 => {
                Err(RolloverValidationError::InvalidPercentage(*percent))
            }
            Self::Capped { max } if !max.is_positive() => {
                Err(RolloverValidationError::NonPositiveCap)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RolloverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Full => write!(f, "full"),
            Self::Percentage { percent } => write!(f, "percentage ({}%)", percent),
            Self::Capped { max } => write!(f, "capped (max {})", max),
        }
    }
}

/// Validation errors for rollover strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverValidationError {
    InvalidPercentage(u8),
    NonPositiveCap,
}

impl fmt::Display for RolloverValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPercentage(p) => {
                write!(f, "Rollover percentage must be 0-100, got {}", p)
            }
            Self::NonPositiveCap => write!(f, "Rollover cap must be positive"),
        }
    }
}

impl std::error::Error for RolloverValidationError {}

/// Immutable audit record of one envelope's carry-over during a month advance
///
/// Written once per advance per envelope, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverHistoryEntry {
    pub envelope_id: EnvelopeId,
    pub source_month: MonthKey,
    pub target_month: MonthKey,
    pub amount: Money,
    pub strategy: RolloverStrategy,

    /// Whether the carry-over was clamped by a cap or a savings goal
    #[serde(default)]
    pub is_capped: bool,

    pub created_at: DateTime<Utc>,
}

impl RolloverHistoryEntry {
    pub fn new(
        envelope_id: EnvelopeId,
        source_month: MonthKey,
        target_month: MonthKey,
        amount: Money,
        strategy: RolloverStrategy,
        is_capped: bool,
    ) -> Self {
        Self {
            envelope_id,
            source_month,
            target_month,
            amount,
            strategy,
            is_capped,
            created_at: Utc::now(),
        }
    }
}
