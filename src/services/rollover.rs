//! Rollover service
//!
//! Advances the ledger from one month to the next: every envelope with a
//! rollover strategy is copied into the target month carrying its strategy's
//! share of the unspent balance, clamped by an active savings goal. The
//! whole copy-set commits as a unit and the history log guards against
//! running the same advance twice.

use log::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, Money, MonthKey, RolloverHistoryEntry, RolloverStrategy};
use crate::storage::{ChangeEvent, Storage};

/// One envelope's carry-over during a month advance
#[derive(Debug, Clone)]
pub struct RolloverOutcome {
    pub envelope_id: EnvelopeId,
    pub envelope_name: String,
    pub carried: Money,
    pub strategy: RolloverStrategy,
    /// Whether a cap or a savings goal clamped the carry-over
    pub is_capped: bool,
}

/// An envelope whose spending exceeded its allocation at month end
///
/// Surfaced separately from the carry-over totals; the shortfall is real
/// even though the carried amount clamps at zero.
#[derive(Debug, Clone)]
pub struct OverdraftWarning {
    pub envelope_id: EnvelopeId,
    pub envelope_name: String,
    pub amount: Money,
}

/// Result of one month advance
#[derive(Debug, Clone)]
pub struct RolloverReport {
    pub source_month: MonthKey,
    pub target_month: MonthKey,
    pub outcomes: Vec<RolloverOutcome>,
    pub overdrafts: Vec<OverdraftWarning>,
    pub total_carried: Money,
    /// Envelopes excluded from the copy because rollover is off
    pub excluded: usize,
}

/// Service for month-end rollover
pub struct RolloverService<'a> {
    storage: &'a Storage,
}

impl<'a> RolloverService<'a> {
    /// Create a new rollover service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Advance from `source_month` into the following month
    ///
    /// For each envelope whose strategy is not `None`, computes
    /// `net = max(0, allocated - spent)`, applies the strategy, clamps to an
    /// active savings goal's target, and seeds the target month with
    /// `allocated = carry, spent = 0` preserving the envelope's identity and
    /// configuration. The copy-set commits as one batch; history entries
    /// become durable only after it.
    pub fn advance(&self, source_month: MonthKey) -> LedgerResult<RolloverReport> {
        let target_month = source_month.next();

        if self.storage.rollover_log.has_advance(source_month, target_month)? {
            return Err(LedgerError::InconsistentState(format!(
                "month {} has already been advanced into {}",
                source_month, target_month
            )));
        }

        let envelopes = self.storage.envelopes.list_month(source_month)?;

        let mut outcomes = Vec::new();
        let mut overdrafts = Vec::new();
        let mut batch = Vec::new();
        let mut history = Vec::new();
        let mut total_carried = Money::zero();
        let mut excluded = 0;

        for envelope in &envelopes {
            let net = envelope.net_balance();
            let (mut carried, mut is_capped) = match envelope.rollover {
                // Strategy `none` means the envelope does not appear in
                // the target month at all
                RolloverStrategy::None => {
                    excluded += 1;
                    continue;
                }
                RolloverStrategy::Full => (net, false),
                RolloverStrategy::Percentage { percent } => (net.percent_of(percent), false),
                RolloverStrategy::Capped { max } => {
                    if net > max {
                        (max, true)
                    } else {
                        (net, false)
                    }
                }
            };

            let overdraft = envelope.overdraft();
            if overdraft.is_positive() {
                overdrafts.push(OverdraftWarning {
                    envelope_id: envelope.id,
                    envelope_name: envelope.name.clone(),
                    amount: overdraft,
                });
            }

            // An active goal further clamps the carry-over to its target
            if let Some(goal) = self.storage.goals.get(envelope.id)? {
                if !goal.is_paused && carried > goal.target_amount {
                    carried = goal.target_amount;
                    is_capped = true;
                }
            }

            let mut seeded = envelope.clone();
            seeded.month = target_month;
            seeded.allocated = carried;
            seeded.spent = Money::zero();
            let now = chrono::Utc::now();
            seeded.created_at = now;
            seeded.updated_at = now;
            batch.push(seeded);

            history.push(RolloverHistoryEntry::new(
                envelope.id,
                source_month,
                target_month,
                carried,
                envelope.rollover,
                is_capped,
            ));

            total_carried += carried;
            outcomes.push(RolloverOutcome {
                envelope_id: envelope.id,
                envelope_name: envelope.name.clone(),
                carried,
                strategy: envelope.rollover,
                is_capped,
            });
        }

        // All-or-nothing: the target month's copy-set lands as one commit,
        // and history entries only become durable after it
        self.storage.envelopes.insert_month_batch(batch)?;
        self.storage.envelopes.save()?;
        self.storage.rollover_log.append_batch(&history)?;
        self.storage.events.publish(ChangeEvent::MonthAdvanced {
            source: source_month,
            target: target_month,
        });
        self.storage.events.publish(ChangeEvent::Envelopes(target_month));

        info!(
            "advanced {} into {}: {} envelopes carried {}, {} excluded",
            source_month,
            target_month,
            outcomes.len(),
            total_carried,
            excluded
        );
        for overdraft in &overdrafts {
            warn!(
                "envelope '{}' finished {} overdrawn by {}",
                overdraft.envelope_name, source_month, overdraft.amount
            );
        }

        Ok(RolloverReport {
            source_month,
            target_month,
            outcomes,
            overdrafts,
            total_carried,
            excluded,
        })
    }

    /// The recorded history of an envelope's carry-overs, oldest first
    pub fn history(&self, envelope_id: EnvelopeId) -> LedgerResult<Vec<RolloverHistoryEntry>> {
        self.storage.rollover_log.entries_for_envelope(envelope_id)
    }
}
