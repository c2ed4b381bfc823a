//! Envelope service
//!
//! Provides the envelope store operations: creation under the per-month cap,
//! allocation and deallocation against the recomputed "to be budgeted"
//! figure, and guarded deletion.

use log::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Envelope, EnvelopeCategory, EnvelopeIcon, EnvelopeId, Money, MonthKey};
use crate::storage::{ChangeEvent, Storage};

/// Hard cap on envelopes per month
pub const MAX_ENVELOPES_PER_MONTH: usize = 50;

/// Service for envelope management
pub struct EnvelopeService<'a> {
    storage: &'a Storage,
}

impl<'a> EnvelopeService<'a> {
    /// Create a new envelope service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create an envelope for a month with nothing allocated or spent
    pub fn create(
        &self,
        month: MonthKey,
        name: impl Into<String>,
        icon: EnvelopeIcon,
        color: impl Into<String>,
        category: EnvelopeCategory,
    ) -> LedgerResult<Envelope> {
        let envelope = Envelope::new(month, name, icon, color, category);

        envelope
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        if self.storage.envelopes.count_month(month)? >= MAX_ENVELOPES_PER_MONTH {
            return Err(LedgerError::LimitExceeded {
                limit: MAX_ENVELOPES_PER_MONTH,
            });
        }

        self.storage.envelopes.upsert(envelope.clone())?;
        self.storage.envelopes.save()?;
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        info!("created envelope '{}' for {}", envelope.name, month);
        Ok(envelope)
    }

    /// Get an envelope snapshot
    pub fn get(&self, month: MonthKey, envelope_id: EnvelopeId) -> LedgerResult<Envelope> {
        self.storage
            .envelopes
            .get(month, envelope_id)?
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))
    }

    /// List a month's envelopes, sorted by name
    pub fn list(&self, month: MonthKey) -> LedgerResult<Vec<Envelope>> {
        self.storage.envelopes.list_month(month)
    }

    /// Money received this month not yet assigned to any envelope
    ///
    /// Always recomputed from incomes and allocations, never stored.
    pub fn to_be_budgeted(&self, month: MonthKey) -> LedgerResult<Money> {
        let income = self.storage.incomes.total_for_month(month)?;
        let allocated = self.storage.envelopes.total_allocated(month)?;
        Ok(income - allocated)
    }

    /// Assign unbudgeted money to an envelope
    ///
    /// The amount must be positive and fit within the month's recomputed
    /// "to be budgeted"; the bound is re-checked against committed state
    /// inside the repository, so racing allocations cannot jointly
    /// overshoot it.
    pub fn allocate(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        amount: Money,
    ) -> LedgerResult<Envelope> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "Allocation amount must be positive".into(),
            ));
        }

        let income = self.storage.incomes.total_for_month(month)?;
        let envelope =
            self.storage
                .envelopes
                .adjust_allocated(month, envelope_id, amount, Some(income))?;
        self.storage.envelopes.save()?;
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        debug!(
            "allocated {} to '{}' for {} (now {})",
            amount, envelope.name, month, envelope.allocated
        );
        Ok(envelope)
    }

    /// Return unspent allocation to "to be budgeted"
    ///
    /// Money already spent cannot be deallocated.
    pub fn deallocate(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        amount: Money,
    ) -> LedgerResult<Envelope> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "Deallocation amount must be positive".into(),
            ));
        }

        let envelope = self
            .storage
            .envelopes
            .adjust_allocated(month, envelope_id, -amount, None)?;
        self.storage.envelopes.save()?;
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        debug!(
            "deallocated {} from '{}' for {} (now {})",
            amount, envelope.name, month, envelope.allocated
        );
        Ok(envelope)
    }

    /// Set an envelope's allocation to an absolute amount
    ///
    /// Equivalent to allocating or deallocating the difference, with the
    /// same bounds: the new total may not go below what is already spent
    /// nor claim more than "to be budgeted" provides.
    pub fn set_allocation(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        new_total: Money,
    ) -> LedgerResult<Envelope> {
        if new_total.is_negative() {
            return Err(LedgerError::Validation(
                "Allocation cannot be negative".into(),
            ));
        }

        let current = self.get(month, envelope_id)?;
        let delta = new_total - current.allocated;

        if delta.is_zero() {
            return Ok(current);
        }

        if delta.is_positive() {
            self.allocate(month, envelope_id, delta)
        } else {
            self.deallocate(month, envelope_id, -delta)
        }
    }

    /// Delete an envelope
    ///
    /// Irreversible. Refused while a split transaction still references the
    /// envelope through a non-primary leg, or while a savings goal is
    /// attached - deleting either reference first keeps spent totals and
    /// goals consistent. Transactions whose primary envelope goes away are
    /// the caller's responsibility to reassign beforehand.
    pub fn delete(&self, month: MonthKey, envelope_id: EnvelopeId) -> LedgerResult<Envelope> {
        let envelope = self.get(month, envelope_id)?;

        if self
            .storage
            .transactions
            .references_as_split_leg(month, envelope_id)?
        {
            return Err(LedgerError::InconsistentState(format!(
                "envelope '{}' is still referenced by split legs; reassign or delete those splits first",
                envelope.name
            )));
        }

        if self.storage.goals.contains(envelope_id)? {
            return Err(LedgerError::InconsistentState(format!(
                "envelope '{}' has a savings goal attached; delete the goal first",
                envelope.name
            )));
        }

        let removed = self.storage.envelopes.remove(month, envelope_id)?;
        self.storage.envelopes.save()?;
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        info!("deleted envelope '{}' from {}", removed.name, month);
        Ok(removed)
    }
}
