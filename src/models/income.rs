//! Income model
//!
//! Records money received in a given month. The month's "to be budgeted"
//! figure is always recomputed as total income minus total allocation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::IncomeId;
use super::money::Money;
use super::month::MonthKey;

/// Money received in a given month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Income {
    pub id: IncomeId,
    pub month: MonthKey,
    pub amount: Money,
    pub description: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Income {
    /// Create a new income record; the month is derived from the date
    pub fn new(amount: Money, description: impl Into<String>, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: IncomeId::new(),
            month: MonthKey::from_date(date),
            amount,
            description: description.into(),
            date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the income record
    pub fn validate(&self) -> Result<(), IncomeValidationError> {
        if !self.amount.is_positive() {
            return Err(IncomeValidationError::NonPositiveAmount);
        }
        if self.description.trim().is_empty() {
            return Err(IncomeValidationError::EmptyDescription);
        }
        Ok(())
    }
}

impl fmt::Display for Income {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.amount
        )
    }
}

/// Validation errors for incomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomeValidationError {
    NonPositiveAmount,
    EmptyDescription,
}

impl fmt::Display for IncomeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount => write!(f, "Income amount must be positive"),
            Self::EmptyDescription => write!(f, "Income description cannot be empty"),
        }
    }
}

impl std::error::Error for IncomeValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_income() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let income = Income::new(Money::from_cents(200000), "Salary", date);

        assert_eq!(income.month, MonthKey::new(2025, 1));
        assert_eq!(income.amount.cents(), 200000);
        assert_eq!(income.description, "Salary");
    }

    #[test]
    fn test_validation() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

        let income = Income::new(Money::from_cents(200000), "Salary", date);
        assert!(income.validate().is_ok());

        let zero = Income::new(Money::zero(), "Salary", date);
        assert_eq!(
            zero.validate(),
            Err(IncomeValidationError::NonPositiveAmount)
        );

        let unnamed = Income::new(Money::from_cents(100), "  ", date);
        assert_eq!(
            unnamed.validate(),
            Err(IncomeValidationError::EmptyDescription)
        );
    }

    #[test]
    fn test_serialization() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let income = Income::new(Money::from_cents(200000), "Salary", date);

        let json = serde_json::to_string(&income).unwrap();
        let deserialized: Income = serde_json::from_str(&json).unwrap();
        assert_eq!(income.id, deserialized.id);
        assert_eq!(income.amount, deserialized.amount);
    }
}
