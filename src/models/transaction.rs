//! Transaction model
//!
//! Represents an expense recorded against an envelope. A transaction may be
//! split across several envelopes; the split legs then hold the true
//! distribution and the transaction's envelope is the primary leg.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EnvelopeId, TransactionId};
use super::money::Money;
use super::month::MonthKey;

/// Tolerance for split totals, in cents
pub const SPLIT_TOLERANCE_CENTS: i64 = 1;

/// One envelope's share of a split transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLeg {
    /// The envelope this share is spent from
    pub envelope_id: EnvelopeId,

    /// The amount of this share, positive
    pub amount: Money,
}

impl SplitLeg {
    /// Create a new split leg
    pub fn new(envelope_id: EnvelopeId, amount: Money) -> Self {
        Self {
            envelope_id,
            amount,
        }
    }
}

/// An expense recorded against an envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// The envelope this expense is attributed to; for split transactions
    /// this is the primary leg's envelope
    pub envelope_id: EnvelopeId,

    /// The month this expense belongs to, derived from its date
    pub month: MonthKey,

    /// Expense amount, positive
    pub amount: Money,

    /// What the expense was
    pub description: String,

    /// Where the expense happened
    pub merchant: Option<String>,

    /// Expense date
    pub date: NaiveDate,

    /// Free-form notes
    pub notes: Option<String>,

    /// Split legs - non-empty iff the expense is distributed across
    /// several envelopes
    #[serde(default)]
    pub splits: Vec<SplitLeg>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction; the month is derived from the date
    pub fn new(
        envelope_id: EnvelopeId,
        amount: Money,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            envelope_id,
            month: MonthKey::from_date(date),
            amount,
            description: description.into(),
            merchant: None,
            date,
            notes: None,
            splits: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this is a split transaction
    pub fn is_split(&self) -> bool {
        !self.splits.is_empty()
    }

    /// Sum of the split legs; must equal the amount within tolerance
    pub fn splits_total(&self) -> Money {
        self.splits.iter().map(|leg| leg.amount).sum()
    }

    /// Validate the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount);
        }

        if self.description.trim().is_empty() {
            return Err(TransactionValidationError::EmptyDescription);
        }

        if !self.is_split() {
            return Ok(());
        }

        if self.splits.len() < 2 {
            return Err(TransactionValidationError::TooFewSplits);
        }
        if self.splits.iter().any(|leg| !leg.amount.is_positive()) {
            return Err(TransactionValidationError::NonPositiveSplitAmount);
        }

        let legs_total = self.splits_total();
        if (legs_total - self.amount).abs().cents() > SPLIT_TOLERANCE_CENTS {
            return Err(TransactionValidationError::SplitsMismatch {
                amount: self.amount,
                legs_total,
            });
        }

        Ok(())
    }
}

impl fmt::Display for Transaction {
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

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    NonPositiveAmount,
    EmptyDescription,
    TooFewSplits,
    NonPositiveSplitAmount,
    SplitsMismatch { amount: Money, legs_total: Money },
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount => write!(f, "transaction amount must be positive"),
            Self::EmptyDescription => write!(f, "transaction description cannot be empty"),
            Self::TooFewSplits => write!(f, "a split needs at least two legs"),
            Self::NonPositiveSplitAmount => write!(f, "split leg amounts must be positive"),
            Self::SplitsMismatch { amount, legs_total } => write!(
                f,
                "split legs total {} against a transaction amount of {}",
                legs_total, amount
            ),
        }
    }
}

impl std::error::Error for TransactionValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let envelope_id = EnvelopeId::new();
        let txn = Transaction::new(envelope_id, Money::from_cents(4530), "Weekly shop", test_date());

        assert_eq!(txn.envelope_id, envelope_id);
        assert_eq!(txn.month, MonthKey::new(2025, 1));
        assert_eq!(txn.amount.cents(), 4530);
        assert!(!txn.is_split());
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let txn = Transaction::new(EnvelopeId::new(), Money::zero(), "Nothing", test_date());
        assert_eq!(
            txn.validate(),
            Err(TransactionValidationError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_split_transaction() {
        let mut txn =
            Transaction::new(EnvelopeId::new(), Money::from_cents(5000), "Mixed basket", test_date());
        txn.splits = vec![
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(3000)),
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(2000)),
        ];

        assert!(txn.is_split());
        assert_eq!(txn.splits_total().cents(), 5000);
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_split_within_tolerance() {
        let mut txn =
            Transaction::new(EnvelopeId::new(), Money::from_cents(5000), "Mixed basket", test_date());
        txn.splits = vec![
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(2999)),
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(2000)),
        ];

        // off by exactly one cent is accepted
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_split_mismatch() {
        let mut txn =
            Transaction::new(EnvelopeId::new(), Money::from_cents(5000), "Mixed basket", test_date());
        txn.splits = vec![
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(2000)),
            SplitLeg::new(EnvelopeId::new(), Money::from_cents(2000)),
        ];

        assert!(matches!(
            txn.validate(),
            Err(TransactionValidationError::SplitsMismatch { .. })
        ));
    }

    #[test]
    fn test_single_leg_rejected() {
        let mut txn =
            Transaction::new(EnvelopeId::new(), Money::from_cents(5000), "Mixed basket", test_date());
        txn.splits = vec![SplitLeg::new(EnvelopeId::new(), Money::from_cents(5000))];

        assert_eq!(txn.validate(), Err(TransactionValidationError::TooFewSplits));
    }

    #[test]
    fn test_serialization() {
        let txn = Transaction::new(
            EnvelopeId::new(),
            Money::from_cents(4530),
            "Weekly shop",
            test_date(),
        );

        let json = serde_json::to_string(&txn).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(txn.id, deserialized.id);
        assert_eq!(txn.amount, deserialized.amount);
        assert_eq!(txn.description, deserialized.description);
    }
}
