//! Income service
//!
//! Manages income records and surfaces a deficit-covering plan when a
//! deletion drives "to be budgeted" negative.

use chrono::NaiveDate;
use log::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, Income, IncomeId, Money, MonthKey};
use crate::storage::{ChangeEvent, Storage};

/// One suggested deallocation toward covering a deficit
#[derive(Debug, Clone)]
pub struct DeallocationStep {
    pub envelope_id: EnvelopeId,
    pub envelope_name: String,
    pub amount: Money,
}

/// Advisory plan for bringing a negative "to be budgeted" back to zero
///
/// Walks the month's envelopes largest-available-first. Nothing is applied;
/// the caller decides.
#[derive(Debug, Clone)]
pub struct DeficitPlan {
    pub deficit: Money,
    pub steps: Vec<DeallocationStep>,
    /// Whether the steps fully cover the deficit
    pub covered: bool,
}

/// Result of deleting an income
#[derive(Debug, Clone)]
pub struct DeleteIncomeOutcome {
    pub income: Income,
    /// Present when the deletion left the month over-budgeted
    pub deficit_plan: Option<DeficitPlan>,
}

/// Service for income management
pub struct IncomeService<'a> {
    storage: &'a Storage,
}

impl<'a> IncomeService<'a> {
    /// Create a new income service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record an income; it lands in the month containing its date
    pub fn add(
        &self,
        amount: Money,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> LedgerResult<Income> {
        let income = Income::new(amount, description, date);
        income
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.incomes.upsert(income.clone())?;
        self.storage.incomes.save()?;
        self.storage.events.publish(ChangeEvent::Incomes(income.month));

        info!("recorded income {} for {}", income.amount, income.month);
        Ok(income)
    }

    /// Get an income by ID
    pub fn get(&self, id: IncomeId) -> LedgerResult<Income> {
        self.storage
            .incomes
            .get(id)?
            .ok_or_else(|| LedgerError::income_not_found(id.to_string()))
    }

    /// List a month's incomes, oldest first
    pub fn list_month(&self, month: MonthKey) -> LedgerResult<Vec<Income>> {
        self.storage.incomes.list_month(month)
    }

    /// Update an income's amount or description
    pub fn update(
        &self,
        id: IncomeId,
        amount: Option<Money>,
        description: Option<String>,
    ) -> LedgerResult<Income> {
        let mut income = self.get(id)?;

        if let Some(amount) = amount {
            income.amount = amount;
        }
        if let Some(description) = description {
            income.description = description;
        }
        income.updated_at = chrono::Utc::now();

        income
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.incomes.upsert(income.clone())?;
        self.storage.incomes.save()?;
        self.storage.events.publish(ChangeEvent::Incomes(income.month));

        Ok(income)
    }

    /// Delete an income
    ///
    /// May drive the month's "to be budgeted" negative; that is allowed, and
    /// the outcome then carries an advisory plan for covering the deficit by
    /// deallocating from envelopes with available funds.
    pub fn delete(&self, id: IncomeId) -> LedgerResult<DeleteIncomeOutcome> {
        let income = self.storage.incomes.remove(id)?;
        self.storage.incomes.save()?;
        self.storage.events.publish(ChangeEvent::Incomes(income.month));

        let deficit_plan = self.deficit_plan(income.month)?;
        if let Some(plan) = &deficit_plan {
            warn!(
                "deleting income {} left {} over-budgeted by {}",
                income.id, income.month, plan.deficit
            );
        }

        Ok(DeleteIncomeOutcome {
            income,
            deficit_plan,
        })
    }

    /// Build a deficit-covering plan for a month, if one is needed
    ///
    /// Returns `None` while "to be budgeted" is not negative. Otherwise
    /// suggests deallocations across envelopes with available (unspent)
    /// funds, largest available first, until the deficit is covered.
    pub fn deficit_plan(&self, month: MonthKey) -> LedgerResult<Option<DeficitPlan>> {
        let income = self.storage.incomes.total_for_month(month)?;
        let allocated = self.storage.envelopes.total_allocated(month)?;
        let to_be_budgeted = income - allocated;

        if !to_be_budgeted.is_negative() {
            return Ok(None);
        }

        let deficit = -to_be_budgeted;
        let mut envelopes = self.storage.envelopes.list_month(month)?;
        envelopes.retain(|e| e.available().is_positive());
        envelopes.sort_by(|a, b| b.available().cmp(&a.available()));

        let mut steps = Vec::new();
        let mut remaining = deficit;
        for envelope in envelopes {
            if remaining.is_zero() {
                break;
            }
            let take = envelope.available().min(remaining);
            steps.push(DeallocationStep {
                envelope_id: envelope.id,
                envelope_name: envelope.name.clone(),
                amount: take,
            });
            remaining -= take;
        }

        Ok(Some(DeficitPlan {
            deficit,
            covered: remaining.is_zero(),
            steps,
        }))
    }
}
