//! Savings goal model
//!
//! A savings goal attaches to exactly one envelope and tracks a target
//! amount, optional deadline, and auto-contribution rules. Goals persist
//! across months for as long as their envelope recurs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::EnvelopeId;
use super::money::Money;

/// Funding priority when to-be-budgeted cannot cover every goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Essential,
    High,
    Medium,
    Low,
}

impl fmt::Display for GoalPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Essential => write!(f, "Essential"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

fn default_thresholds() -> Vec<u8> {
    vec![25, 50, 75, 100]
}

/// A savings target attached to one envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    /// The envelope this goal funds (1:1)
    pub envelope_id: EnvelopeId,

    /// Target amount to accumulate
    pub target_amount: Money,

    /// Optional deadline
    pub target_date: Option<NaiveDate>,

    /// Funding priority for auto-contribution
    pub priority: GoalPriority,

    /// Whether the auto-contribution scheduler should fund this goal
    #[serde(default)]
    pub auto_contribute: bool,

    /// Fixed monthly contribution amount
    pub monthly_contribution: Option<Money>,

    /// Percentage of to-be-budgeted to contribute (0-100), used when no
    /// fixed contribution is set
    pub contribution_percentage: Option<u8>,

    /// Progress percentages worth celebrating when crossed
    #[serde(default = "default_thresholds")]
    pub celebration_thresholds: Vec<u8>,

    /// Paused goals are skipped by auto-contribution entirely
    #[serde(default)]
    pub is_paused: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavingsGoal {
    /// Create a new goal with default priority and no contribution rules
    pub fn new(envelope_id: EnvelopeId, target_amount: Money) -> Self {
        let now = Utc::now();
        Self {
            envelope_id,
            target_amount,
            target_date: None,
            priority: GoalPriority::Medium,
            auto_contribute: false,
            monthly_contribution: None,
            contribution_percentage: None,
            celebration_thresholds: default_thresholds(),
            is_paused: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the auto-contribution scheduler should consider this goal
    pub fn is_active_for_contributions(&self) -> bool {
        self.auto_contribute && !self.is_paused
    }

    /// Progress toward the target, as a percentage clamped to 100
    pub fn percent_complete(&self, allocated: Money) -> f64 {
        if !self.target_amount.is_positive() {
            return 100.0;
        }
        let percent = allocated.cents() as f64 * 100.0 / self.target_amount.cents() as f64;
        percent.clamp(0.0, 100.0)
    }

    /// Check if the envelope's allocation has reached the target
    pub fn is_complete(&self, allocated: Money) -> bool {
        allocated >= self.target_amount
    }

    /// Amount still missing toward the target, zero once complete
    pub fn remaining(&self, allocated: Money) -> Money {
        if self.is_complete(allocated) {
            Money::zero()
        } else {
            self.target_amount - allocated
        }
    }

    /// Celebration thresholds newly crossed when the allocation moves from
    /// `before` to `after`, compared at cent granularity
    pub fn crossed_thresholds(&self, before: Money, after: Money) -> Vec<u8> {
        if !self.target_amount.is_positive() {
            return Vec::new();
        }
        let target = self.target_amount.cents() as i128;
        self.celebration_thresholds
            .iter()
            .copied()
            .filter(|&t| {
                let line = target * t as i128;
                (before.cents() as i128) * 100 < line && (after.cents() as i128) * 100 >= line
            })
            .collect()
    }

    /// Validate the goal
    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if !self.target_amount.is_positive() {
            return Err(GoalValidationError::NonPositiveTarget);
        }

        if let Some(contribution) = self.monthly_contribution {
            if !contribution.is_positive() {
                return Err(GoalValidationError::NonPositiveContribution);
            }
        }

        if let Some(percentage) = self.contribution_percentage {
            if percentage == 0 || percentage > 100 {
                return Err(GoalValidationError::InvalidPercentage(percentage));
            }
        }

        if self.auto_contribute
            && self.monthly_contribution.is_none()
            && self.contribution_percentage.is_none()
        {
            return Err(GoalValidationError::MissingContributionRule);
        }

        if let Some(&t) = self
            .celebration_thresholds
            .iter()
            .find(|&&t| t == 0 || t > 100)
        {
            return Err(GoalValidationError::InvalidThreshold(t));
        }

        Ok(())
    }
}

/// Validation errors for savings goals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    NonPositiveTarget,
    NonPositiveContribution,
    InvalidPercentage(u8),
    MissingContributionRule,
    InvalidThreshold(u8),
}

impl fmt::Display for GoalValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveTarget => write!(f, "Goal target amount must be positive"),
            Self::NonPositiveContribution => {
                write!(f, "Monthly contribution must be positive")
            }
            Self::InvalidPercentage(p) => {
                write!(f, "Contribution percentage must be 1-100, got {}", p)
            }
            Self::MissingContributionRule => write!(
                f,
                "Auto-contribution needs a monthly amount or a percentage"
            ),
            Self::InvalidThreshold(t) => {
                write!(f, "Celebration threshold must be 1-100, got {}", t)
            }
        }
    }
}

impl std::error::Error for GoalValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_goal() {
        let goal = SavingsGoal::new(EnvelopeId::new(), Money::from_cents(100000));
        assert_eq!(goal.priority, GoalPriority::Medium);
        assert!(!goal.auto_contribute);
        assert!(!goal.is_paused);
        assert_eq!(goal.celebration_thresholds, vec![25, 50, 75, 100]);
        assert!(goal.validate().is_ok());
    }

    #[test]
    fn test_progress() {
        let goal = SavingsGoal::new(EnvelopeId::new(), Money::from_cents(100000));

        assert_eq!(goal.percent_complete(Money::from_cents(25000)), 25.0);
        assert_eq!(goal.percent_complete(Money::from_cents(150000)), 100.0);
        assert!(!goal.is_complete(Money::from_cents(99999)));
        assert!(goal.is_complete(Money::from_cents(100000)));
        assert_eq!(goal.remaining(Money::from_cents(25000)).cents(), 75000);
        assert_eq!(goal.remaining(Money::from_cents(150000)), Money::zero());
    }

    #[test]
    fn test_crossed_thresholds() {
        let goal = SavingsGoal::new(EnvelopeId::new(), Money::from_cents(10000));

        let crossed = goal.crossed_thresholds(Money::from_cents(2000), Money::from_cents(5000));
        assert_eq!(crossed, vec![25, 50]);

        // landing exactly on a threshold counts
        let crossed = goal.crossed_thresholds(Money::from_cents(7400), Money::from_cents(7500));
        assert_eq!(crossed, vec![75]);

        // no movement across a line
        let crossed = goal.crossed_thresholds(Money::from_cents(2600), Money::from_cents(4900));
        assert!(crossed.is_empty());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(GoalPriority::Essential < GoalPriority::High);
        assert!(GoalPriority::High < GoalPriority::Medium);
        assert!(GoalPriority::Medium < GoalPriority::Low);
    }

    #[test]
    fn test_validation() {
        let mut goal = SavingsGoal::new(EnvelopeId::new(), Money::zero());
        assert_eq!(goal.validate(), Err(GoalValidationError::NonPositiveTarget));

        goal.target_amount = Money::from_cents(100000);
        goal.auto_contribute = true;
        assert_eq!(
            goal.validate(),
            Err(GoalValidationError::MissingContributionRule)
        );

        goal.contribution_percentage = Some(150);
        assert_eq!(
            goal.validate(),
            Err(GoalValidationError::InvalidPercentage(150))
        );

        goal.contribution_percentage = Some(10);
        assert!(goal.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let mut goal = SavingsGoal::new(EnvelopeId::new(), Money::from_cents(100000));
        goal.priority = GoalPriority::Essential;
        goal.monthly_contribution = Some(Money::from_cents(10000));

        let json = serde_json::to_string(&goal).unwrap();
        let deserialized: SavingsGoal = serde_json::from_str(&json).unwrap();
        assert_eq!(goal.envelope_id, deserialized.envelope_id);
        assert_eq!(goal.priority, deserialized.priority);
        assert_eq!(goal.monthly_contribution, deserialized.monthly_contribution);
    }
}
