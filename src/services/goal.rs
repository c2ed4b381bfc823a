//! Savings goal service
//!
//! Manages the 1:1 goal attached to an envelope, derives progress views,
//! and plans auto-contributions: priority-ordered allocations funded from
//! "to be budgeted" through the envelope store's own invariants.

use log::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, GoalPriority, Money, MonthKey, SavingsGoal};
use crate::services::EnvelopeService;
use crate::storage::{ChangeEvent, Storage};

/// Input for creating a savings goal
#[derive(Debug, Clone)]
pub struct CreateGoalInput {
    pub envelope_id: EnvelopeId,
    pub target_amount: Money,
    pub target_date: Option<chrono::NaiveDate>,
    pub priority: GoalPriority,
    pub auto_contribute: bool,
    pub monthly_contribution: Option<Money>,
    pub contribution_percentage: Option<u8>,
}

/// Field changes to apply to a goal
#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub target_amount: Option<Money>,
    pub target_date: Option<Option<chrono::NaiveDate>>,
    pub priority: Option<GoalPriority>,
    pub auto_contribute: Option<bool>,
    pub monthly_contribution: Option<Option<Money>>,
    pub contribution_percentage: Option<Option<u8>>,
    pub is_paused: Option<bool>,
}

/// Progress view over a goal for one month, derived on demand
#[derive(Debug, Clone)]
pub struct GoalProgress {
    pub envelope_id: EnvelopeId,
    pub target_amount: Money,
    pub allocated: Money,
    pub percent_complete: f64,
    pub is_complete: bool,
    pub remaining: Money,
}

/// One planned auto-contribution
#[derive(Debug, Clone)]
pub struct PlannedContribution {
    pub envelope_id: EnvelopeId,
    pub envelope_name: String,
    pub amount: Money,
    pub priority: GoalPriority,
}

/// One applied auto-contribution, with the celebration thresholds the
/// allocation newly crossed
#[derive(Debug, Clone)]
pub struct AppliedContribution {
    pub contribution: PlannedContribution,
    pub celebrations: Vec<u8>,
}

/// Service for savings goal management
pub struct GoalService<'a> {
    storage: &'a Storage,
}

impl<'a> GoalService<'a> {
    /// Create a new goal service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Attach a goal to an envelope
    ///
    /// Exactly one goal per envelope; the envelope must exist in some month.
    pub fn create(&self, input: CreateGoalInput) -> LedgerResult<SavingsGoal> {
        if !self.storage.envelopes.contains_id(input.envelope_id)? {
            return Err(LedgerError::envelope_not_found(
                input.envelope_id.to_string(),
            ));
        }

        if self.storage.goals.contains(input.envelope_id)? {
            return Err(LedgerError::Duplicate {
                entity: "savings goal",
                id: input.envelope_id.to_string(),
            });
        }

        let mut goal = SavingsGoal::new(input.envelope_id, input.target_amount);
        goal.target_date = input.target_date;
        goal.priority = input.priority;
        goal.auto_contribute = input.auto_contribute;
        goal.monthly_contribution = input.monthly_contribution;
        goal.contribution_percentage = input.contribution_percentage;

        goal.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.goals.upsert(goal.clone())?;
        self.storage.goals.save()?;
        self.storage.events.publish(ChangeEvent::Goal(goal.envelope_id));

        info!(
            "created goal of {} for envelope {}",
            goal.target_amount, goal.envelope_id
        );
        Ok(goal)
    }

    /// Get the goal attached to an envelope
    pub fn get(&self, envelope_id: EnvelopeId) -> LedgerResult<SavingsGoal> {
        self.storage
            .goals
            .get(envelope_id)?
            .ok_or_else(|| LedgerError::goal_not_found(envelope_id.to_string()))
    }

    /// Apply a patch to a goal
    pub fn update(&self, envelope_id: EnvelopeId, patch: GoalPatch) -> LedgerResult<SavingsGoal> {
        let mut goal = self.get(envelope_id)?;

        if let Some(target_amount) = patch.target_amount {
            goal.target_amount = target_amount;
        }
        if let Some(target_date) = patch.target_date {
            goal.target_date = target_date;
        }
        if let Some(priority) = patch.priority {
            goal.priority = priority;
        }
        if let Some(auto_contribute) = patch.auto_contribute {
            goal.auto_contribute = auto_contribute;
        }
        if let Some(monthly_contribution) = patch.monthly_contribution {
            goal.monthly_contribution = monthly_contribution;
        }
        if let Some(contribution_percentage) = patch.contribution_percentage {
            goal.contribution_percentage = contribution_percentage;
        }
        if let Some(is_paused) = patch.is_paused {
            goal.is_paused = is_paused;
        }
        goal.updated_at = chrono::Utc::now();

        goal.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.goals.upsert(goal.clone())?;
        self.storage.goals.save()?;
        self.storage.events.publish(ChangeEvent::Goal(goal.envelope_id));

        Ok(goal)
    }

    /// Detach and delete a goal; the envelope is untouched
    pub fn delete(&self, envelope_id: EnvelopeId) -> LedgerResult<SavingsGoal> {
        let removed = self.storage.goals.remove(envelope_id)?;
        self.storage.goals.save()?;
        self.storage.events.publish(ChangeEvent::Goal(envelope_id));

        info!("deleted goal for envelope {}", envelope_id);
        Ok(removed)
    }

    /// Derive a goal's progress from the envelope's allocation in a month
    pub fn progress(&self, month: MonthKey, envelope_id: EnvelopeId) -> LedgerResult<GoalProgress> {
        let goal = self.get(envelope_id)?;
        let envelope = self
            .storage
            .envelopes
            .get(month, envelope_id)?
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))?;

        Ok(GoalProgress {
            envelope_id,
            target_amount: goal.target_amount,
            allocated: envelope.allocated,
            percent_complete: goal.percent_complete(envelope.allocated),
            is_complete: goal.is_complete(envelope.allocated),
            remaining: goal.remaining(envelope.allocated),
        })
    }

    /// Plan this month's auto-contributions
    ///
    /// Considers auto-contributing, unpaused goals whose envelope exists in
    /// the month and is not already at target. Each desired amount comes
    /// from the fixed monthly contribution or the percentage of the current
    /// "to be budgeted"; goals fund essential-first while money remains.
    pub fn plan_contributions(&self, month: MonthKey) -> LedgerResult<Vec<PlannedContribution>> {
        let envelope_service = EnvelopeService::new(self.storage);
        let to_be_budgeted = envelope_service.to_be_budgeted(month)?;
        if !to_be_budgeted.is_positive() {
            return Ok(Vec::new());
        }

        let mut goals = self.storage.goals.list()?;
        goals.retain(|g| g.is_active_for_contributions());
        goals.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let mut plan = Vec::new();
        let mut remaining = to_be_budgeted;
        for goal in goals {
            if remaining.is_zero() {
                break;
            }

            let envelope = match self.storage.envelopes.get(month, goal.envelope_id)? {
                Some(envelope) => envelope,
                None => {
                    debug!(
                        "goal for envelope {} skipped: not present in {}",
                        goal.envelope_id, month
                    );
                    continue;
                }
            };

            if goal.is_complete(envelope.allocated) {
                continue;
            }

            let desired = match (goal.monthly_contribution, goal.contribution_percentage) {
                (Some(fixed), _) => fixed,
                (None, Some(percentage)) => to_be_budgeted.percent_of(percentage),
                (None, None) => continue,
            };

            let amount = desired.min(remaining).min(goal.remaining(envelope.allocated));
            if !amount.is_positive() {
                continue;
            }

            remaining -= amount;
            plan.push(PlannedContribution {
                envelope_id: goal.envelope_id,
                envelope_name: envelope.name,
                amount,
                priority: goal.priority,
            });
        }

        Ok(plan)
    }

    /// Plan and apply this month's auto-contributions
    ///
    /// Each planned amount goes through the envelope store's `allocate`,
    /// inheriting its bounds and atomicity. Newly crossed celebration
    /// thresholds are reported per contribution, advisory only.
    pub fn apply_contributions(
        &self,
        month: MonthKey,
    ) -> LedgerResult<Vec<AppliedContribution>> {
        let plan = self.plan_contributions(month)?;
        let envelope_service = EnvelopeService::new(self.storage);

        let mut applied = Vec::with_capacity(plan.len());
        for contribution in plan {
            let goal = self.get(contribution.envelope_id)?;
            let updated =
                envelope_service.allocate(month, contribution.envelope_id, contribution.amount)?;
            let celebrations =
                goal.crossed_thresholds(updated.allocated - contribution.amount, updated.allocated);
            if !celebrations.is_empty() {
                info!(
                    "goal for '{}' crossed {:?}% of its target",
                    contribution.envelope_name, celebrations
                );
            }
            applied.push(AppliedContribution {
                contribution,
                celebrations,
            });
        }

        if !applied.is_empty() {
            info!("applied {} auto-contributions for {}", applied.len(), month);
        }
        Ok(applied)
    }
}
