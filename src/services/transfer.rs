//! Transfer service
//!
//! Moves allocated-but-unspent funds between two envelopes of the same
//! month. Transfers never touch "to be budgeted", incomes, or spent
//! figures; both sides commit atomically.

use log::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Envelope, EnvelopeId, Money, MonthKey};
use crate::storage::{ChangeEvent, Storage};

/// Result of a transfer, carrying both updated envelopes
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub from: Envelope,
    pub to: Envelope,
}

/// Service for moving allocation between envelopes
pub struct TransferService<'a> {
    storage: &'a Storage,
}

impl<'a> TransferService<'a> {
    /// Create a new transfer service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Move `amount` of unspent allocation from one envelope to another
    ///
    /// Only the source's unspent allocation is transferable; the bound is
    /// checked against committed state in the same atomic commit that moves
    /// both sides.
    pub fn transfer(
        &self,
        month: MonthKey,
        from: EnvelopeId,
        to: EnvelopeId,
        amount: Money,
    ) -> LedgerResult<TransferOutcome> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "Transfer amount must be positive".into(),
            ));
        }

        if from == to {
            return Err(LedgerError::Validation(
                "Cannot transfer an envelope's funds to itself".into(),
            ));
        }

        let updated = self
            .storage
            .envelopes
            .commit_allocation_moves(&[(month, from, -amount), (month, to, amount)])?;
        self.storage.envelopes.save()?;
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        let from_envelope = updated
            .iter()
            .find(|e| e.id == from)
            .cloned()
            .ok_or_else(|| LedgerError::envelope_not_found(from.to_string()))?;
        let to_envelope = updated
            .iter()
            .find(|e| e.id == to)
            .cloned()
            .ok_or_else(|| LedgerError::envelope_not_found(to.to_string()))?;

        info!(
            "transferred {} from '{}' to '{}' for {}",
            amount, from_envelope.name, to_envelope.name, month
        );

        Ok(TransferOutcome {
            from: from_envelope,
            to: to_envelope,
        })
    }
}
