//! Envelope model
//!
//! An envelope is a named budget bucket scoped to one month, tracking the
//! amount allocated to it and the amount spent against it. Icons and
//! categories are closed enums rather than string-keyed lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::EnvelopeId;
use super::money::Money;
use super::month::MonthKey;
use super::rollover::RolloverStrategy;

/// Broad classification of an envelope's purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeCategory {
    Essential,
    Lifestyle,
    Savings,
}

impl EnvelopeCategory {
    /// Get all categories in display order
    pub fn all() -> &'static [Self] {
        &[Self::Essential, Self::Lifestyle, Self::Savings]
    }
}

impl fmt::Display for EnvelopeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Essential => write!(f, "Essential"),
            Self::Lifestyle => write!(f, "Lifestyle"),
            Self::Savings => write!(f, "Savings"),
        }
    }
}

/// Closed set of icons an envelope can display with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeIcon {
    #[default]
    Wallet,
    Basket,
    Cutlery,
    House,
    Car,
    Bolt,
    Heart,
    Gamepad,
    Shirt,
    Gift,
    Plane,
    Book,
    PiggyBank,
    Paw,
    Stroller,
}

impl EnvelopeIcon {
    /// Stable lowercase label, as used by display layers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Basket => "basket",
            Self::Cutlery => "cutlery",
            Self::House => "house",
            Self::Car => "car",
            Self::Bolt => "bolt",
            Self::Heart => "heart",
            Self::Gamepad => "gamepad",
            Self::Shirt => "shirt",
            Self::Gift => "gift",
            Self::Plane => "plane",
            Self::Book => "book",
            Self::PiggyBank => "piggybank",
            Self::Paw => "paw",
            Self::Stroller => "stroller",
        }
    }
}

/// A budget envelope for one month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Identity of the envelope, stable across months when rolled over
    pub id: EnvelopeId,

    /// The month this snapshot belongs to
    pub month: MonthKey,

    /// Envelope name
    pub name: String,

    /// Display icon
    #[serde(default)]
    pub icon: EnvelopeIcon,

    /// Display color (hex string)
    #[serde(default)]
    pub color: String,

    /// Purpose classification
    pub category: EnvelopeCategory,

    /// Amount allocated to this envelope this month; never negative
    pub allocated: Money,

    /// Amount spent against this envelope this month; kept in sync with the
    /// transactions and split legs that reference it
    pub spent: Money,

    /// How the unspent balance carries into the next month
    #[serde(default)]
    pub rollover: RolloverStrategy,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Envelope {
    /// Create a new envelope with nothing allocated or spent
    pub fn new(
        month: MonthKey,
        name: impl Into<String>,
        icon: EnvelopeIcon,
        color: impl Into<String>,
        category: EnvelopeCategory,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EnvelopeId::new(),
            month,
            name: name.into(),
            icon,
            color: color.into(),
            category,
            allocated: Money::zero(),
            spent: Money::zero(),
            rollover: RolloverStrategy::None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Allocated money not yet spent; negative when overspent
    pub fn available(&self) -> Money {
        self.allocated - self.spent
    }

    /// Unspent balance clamped at zero, the base amount for rollover
    pub fn net_balance(&self) -> Money {
        let available = self.available();
        if available.is_negative() {
            Money::zero()
        } else {
            available
        }
    }

    /// How far spending exceeds the allocation, zero when within budget
    pub fn overdraft(&self) -> Money {
        let available = self.available();
        if available.is_negative() {
            -available
        } else {
            Money::zero()
        }
    }

    /// Check if spending exceeds the allocation
    pub fn is_overspent(&self) -> bool {
        self.spent > self.allocated
    }

    /// Set the rollover strategy
    pub fn set_rollover(&mut self, strategy: RolloverStrategy) {
        self.rollover = strategy;
        self.updated_at = Utc::now();
    }

    /// Validate the envelope
    pub fn validate(&self) -> Result<(), EnvelopeValidationError> {
        if self.name.trim().is_empty() {
            return Err(EnvelopeValidationError::EmptyName);
        }

        if self.name.len() > 50 {
            return Err(EnvelopeValidationError::NameTooLong(self.name.len()));
        }

        if self.allocated.is_negative() {
            return Err(EnvelopeValidationError::NegativeAllocation);
        }

        self.rollover
            .validate()
            .map_err(EnvelopeValidationError::Rollover)?;

        Ok(())
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): allocated {}, spent {}",
            self.name, self.month, self.allocated, self.spent
        )
    }
}

/// Validation errors for envelopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeValidationError {
    EmptyName,
    NameTooLong(usize),
    NegativeAllocation,
    Rollover(super::rollover::RolloverValidationError),
}

impl fmt::Display for EnvelopeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Envelope name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Envelope name too long ({} chars, max 50)", len)
            }
            Self::NegativeAllocation => write!(f, "Allocated amount cannot be negative"),
            Self::Rollover(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EnvelopeValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_envelope() -> Envelope {
        Envelope::new(
            MonthKey::new(2025, 1),
            "Groceries",
            EnvelopeIcon::Basket,
            "#4caf50",
            EnvelopeCategory::Essential,
        )
    }

    #[test]
    fn test_new_envelope() {
        let envelope = test_envelope();
        assert_eq!(envelope.name, "Groceries");
        assert_eq!(envelope.allocated, Money::zero());
        assert_eq!(envelope.spent, Money::zero());
        assert_eq!(envelope.rollover, RolloverStrategy::None);
    }

    #[test]
    fn test_available_and_net_balance() {
        let mut envelope = test_envelope();
        envelope.allocated = Money::from_cents(10000);
        envelope.spent = Money::from_cents(4000);

        assert_eq!(envelope.available().cents(), 6000);
        assert_eq!(envelope.net_balance().cents(), 6000);
        assert!(!envelope.is_overspent());
        assert!(envelope.overdraft().is_zero());
    }

    #[test]
    fn test_overspend() {
        let mut envelope = test_envelope();
        envelope.allocated = Money::from_cents(10000);
        envelope.spent = Money::from_cents(12000);

        assert_eq!(envelope.available().cents(), -2000);
        assert_eq!(envelope.net_balance(), Money::zero());
        assert_eq!(envelope.overdraft().cents(), 2000);
        assert!(envelope.is_overspent());
    }

    #[test]
    fn test_validation() {
        let mut envelope = test_envelope();
        assert!(envelope.validate().is_ok());

        envelope.name = String::new();
        assert_eq!(envelope.validate(), Err(EnvelopeValidationError::EmptyName));

        envelope.name = "a".repeat(51);
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeValidationError::NameTooLong(_))
        ));

        envelope.name = "Groceries".to_string();
        envelope.allocated = Money::from_cents(-100);
        assert_eq!(
            envelope.validate(),
            Err(EnvelopeValidationError::NegativeAllocation)
        );

        envelope.allocated = Money::zero();
        envelope.rollover = RolloverStrategy::Percentage { percent: 150 };
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeValidationError::Rollover(_))
        ));
    }

    #[test]
    fn test_icon_labels_are_distinct() {
        use std::collections::HashSet;
        let labels: HashSet<_> = [
            EnvelopeIcon::Wallet,
            EnvelopeIcon::Basket,
            EnvelopeIcon::Cutlery,
            EnvelopeIcon::House,
            EnvelopeIcon::Car,
            EnvelopeIcon::Bolt,
            EnvelopeIcon::Heart,
            EnvelopeIcon::Gamepad,
            EnvelopeIcon::Shirt,
            EnvelopeIcon::Gift,
            EnvelopeIcon::Plane,
            EnvelopeIcon::Book,
            EnvelopeIcon::PiggyBank,
            EnvelopeIcon::Paw,
            EnvelopeIcon::Stroller,
        ]
        .iter()
        .map(|i| i.label())
        .collect();
        assert_eq!(labels.len(), 15);
    }

    #[test]
    fn test_serialization() {
        let mut envelope = test_envelope();
        envelope.rollover = RolloverStrategy::Capped {
            max: Money::from_cents(5000),
        };

        let json = serde_json::to_string(&envelope).unwrap();
        let deserialized: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope.id, deserialized.id);
        assert_eq!(envelope.rollover, deserialized.rollover);
    }
}
