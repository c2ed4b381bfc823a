//! Transaction service
//!
//! Records expenses against envelopes and keeps each envelope's `spent`
//! figure in step with them. Editing or deleting a transaction reverses its
//! old effect and applies the new one in a single atomic commit.

use chrono::{Duration, NaiveDate};
use log::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, Money, MonthKey, Transaction, TransactionId};
use crate::storage::{ChangeEvent, Storage};

/// How far back the possible-duplicate heuristic looks
const DUPLICATE_WINDOW_MINUTES: i64 = 5;

/// Budget usage signal derived from an expense, never stored
///
/// A pure function of the envelope's spent figure before and after the
/// expense and of its allocation, compared at cent granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendingAlert {
    /// Spending crossed 80% of the allocation
    ApproachingLimit { percent_used: u8 },
    /// Spending exceeded the allocation
    OverBudget { overspent: Money },
}

impl SpendingAlert {
    /// Derive the alert raised by moving `spent` from `before` to `after`
    /// against `allocated`
    pub fn evaluate(before: Money, after: Money, allocated: Money) -> Option<Self> {
        if after > allocated && before <= allocated {
            return Some(Self::OverBudget {
                overspent: after - allocated,
            });
        }

        if allocated.is_positive() && after <= allocated {
            let crossed = |spent: Money| spent.cents() * 5 >= allocated.cents() * 4;
            if crossed(after) && !crossed(before) {
                let percent_used = (after.cents() * 100 / allocated.cents()) as u8;
                return Some(Self::ApproachingLimit { percent_used });
            }
        }

        None
    }
}

/// Input for recording a new expense
#[derive(Debug, Clone)]
pub struct AddTransactionInput {
    pub envelope_id: EnvelopeId,
    pub amount: Money,
    pub description: String,
    pub merchant: Option<String>,
    /// Defaults to today; the expense lands in the month containing it
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Result of recording an expense
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub transaction: Transaction,
    /// Threshold signal, if one was crossed
    pub alert: Option<SpendingAlert>,
    /// Advisory only - another expense with the same amount landed on the
    /// same envelope within the last few minutes. Never blocks the write.
    pub possible_duplicate: Option<TransactionId>,
}

/// Field changes to apply to a transaction
///
/// Amount and envelope changes on split transactions are rejected here;
/// their distribution is owned by the split operations.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub envelope_id: Option<EnvelopeId>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub merchant: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

impl TransactionPatch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the expense to a different envelope
    pub fn envelope(mut self, envelope_id: EnvelopeId) -> Self {
        self.envelope_id = Some(envelope_id);
        self
    }

    /// Change the amount
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Change the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Change or clear the merchant
    pub fn merchant(mut self, merchant: Option<String>) -> Self {
        self.merchant = Some(merchant);
        self
    }

    /// Change the date (within the same month)
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Change or clear the notes
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }
}

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

impl<'a> TransactionService<'a> {
    /// Create a new transaction service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record an expense against an envelope
    ///
    /// Side effect: the envelope's `spent` rises by the amount, through the
    /// repository's atomic increment. Returns the derived spending alert and
    /// the possible-duplicate signal alongside the stored transaction.
    pub fn add(&self, input: AddTransactionInput) -> LedgerResult<AddOutcome> {
        if !input.amount.is_positive() {
            return Err(LedgerError::Validation(
                "Transaction amount must be positive".into(),
            ));
        }
        if input.description.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Transaction description is required".into(),
            ));
        }

        let date = input
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let month = MonthKey::from_date(date);

        let mut txn = Transaction::new(input.envelope_id, input.amount, input.description, date);
        txn.merchant = input.merchant;
        txn.notes = input.notes;
        txn.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        // Advisory duplicate check; the write proceeds regardless
        let since = txn.created_at - Duration::minutes(DUPLICATE_WINDOW_MINUTES);
        let possible_duplicate = self.storage.transactions.find_recent_same_amount(
            month,
            input.envelope_id,
            input.amount,
            since,
            txn.id,
        )?;

        let adjustment = self
            .storage
            .envelopes
            .adjust_spent(month, input.envelope_id, input.amount)?;
        self.storage.transactions.upsert(txn.clone())?;

        self.storage.envelopes.save()?;
        self.storage.transactions.save()?;
        self.storage.events.publish(ChangeEvent::Transactions(month));
        self.storage.events.publish(ChangeEvent::Envelopes(month));

        let alert = SpendingAlert::evaluate(
            adjustment.spent_before,
            adjustment.envelope.spent,
            adjustment.envelope.allocated,
        );

        info!(
            "recorded {} on '{}' for {}",
            txn.amount, adjustment.envelope.name, month
        );
        if let Some(SpendingAlert::OverBudget { overspent }) = &alert {
            warn!(
                "envelope '{}' over budget by {}",
                adjustment.envelope.name, overspent
            );
        }

        Ok(AddOutcome {
            transaction: txn,
            alert,
            possible_duplicate,
        })
    }

    /// Get a transaction by ID
    pub fn get(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))
    }

    /// List a month's transactions, newest first
    pub fn list_month(&self, month: MonthKey) -> LedgerResult<Vec<Transaction>> {
        self.storage.transactions.list_month(month)
    }

    /// List the transactions touching an envelope in a month
    pub fn list_for_envelope(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
    ) -> LedgerResult<Vec<Transaction>> {
        self.storage.transactions.list_for_envelope(month, envelope_id)
    }

    /// Apply a patch to a transaction
    ///
    /// When the amount or envelope changes, the old `(envelope, amount)`
    /// spent effect is reversed and the new one applied as one atomic
    /// commit; no reader observes the in-between state, and re-applying the
    /// same patch leaves `spent` unchanged.
    pub fn update(&self, id: TransactionId, patch: TransactionPatch) -> LedgerResult<Transaction> {
        let mut txn = self.get(id)?;

        let balance_change = patch.amount.is_some() || patch.envelope_id.is_some();
        if txn.is_split() && balance_change {
            return Err(LedgerError::Validation(
                "Split transactions are redistributed through update_split".into(),
            ));
        }

        let new_amount = patch.amount.unwrap_or(txn.amount);
        if !new_amount.is_positive() {
            return Err(LedgerError::Validation(
                "Transaction amount must be positive".into(),
            ));
        }
        let new_envelope = patch.envelope_id.unwrap_or(txn.envelope_id);

        if let Some(date) = patch.date {
            if !txn.month.contains(date) {
                return Err(LedgerError::Validation(format!(
                    "Date {} falls outside {}; delete and re-create to move a transaction across months",
                    date, txn.month
                )));
            }
        }

        if new_amount != txn.amount || new_envelope != txn.envelope_id {
            // Reversal and re-application as one commit
            self.storage.envelopes.commit_spent_moves(&[
                (txn.month, txn.envelope_id, -txn.amount),
                (txn.month, new_envelope, new_amount),
            ])?;
        }

        txn.amount = new_amount;
        txn.envelope_id = new_envelope;
        if let Some(description) = patch.description {
            txn.description = description;
        }
        if let Some(merchant) = patch.merchant {
            txn.merchant = merchant;
        }
        if let Some(date) = patch.date {
            txn.date = date;
        }
        if let Some(notes) = patch.notes {
            txn.notes = notes;
        }
        txn.updated_at = chrono::Utc::now();

        txn.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.envelopes.save()?;
        self.storage.transactions.save()?;
        self.storage.events.publish(ChangeEvent::Transactions(txn.month));
        self.storage.events.publish(ChangeEvent::Envelopes(txn.month));

        info!("updated transaction {}", txn.id);
        Ok(txn)
    }

    /// Delete a transaction, reversing its spent effects unconditionally
    ///
    /// For a split transaction every leg's effect is reversed and the legs
    /// go with the row.
    pub fn delete(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let txn = self.get(id)?;

        let moves: Vec<(MonthKey, EnvelopeId, Money)> = if txn.is_split() {
            txn.splits
                .iter()
                .map(|leg| (txn.month, leg.envelope_id, -leg.amount))
                .collect()
        } else {
            vec![(txn.month, txn.envelope_id, -txn.amount)]
        };

        self.storage.envelopes.commit_spent_moves(&moves)?;
        let removed = self.storage.transactions.remove(id)?;

        self.storage.envelopes.save()?;
        self.storage.transactions.save()?;
        self.storage.events.publish(ChangeEvent::Transactions(removed.month));
        self.storage.events.publish(ChangeEvent::Envelopes(removed.month));

        info!("deleted transaction {}", removed.id);
        Ok(removed)
    }
}
