//! Envelope repository
//!
//! Holds every month's envelope snapshots keyed by `(month, envelope id)`.
//! All invariant-bearing arithmetic on `allocated` and `spent` happens inside
//! this repository's write-lock sections as conditional increments, so that
//! concurrent writers re-validate against committed state instead of racing
//! read-modify-write cycles from stale reads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Envelope, EnvelopeId, Money, MonthKey};

use super::file_io::{read_json, write_json_atomic};

/// Composite key for envelope snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvelopeKey {
    pub month: MonthKey,
    pub envelope_id: EnvelopeId,
}

impl EnvelopeKey {
    pub fn new(month: MonthKey, envelope_id: EnvelopeId) -> Self {
        Self { month, envelope_id }
    }
}

/// Serializable envelope data
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    envelopes: Vec<Envelope>,
}

/// Outcome of an atomic `spent` adjustment, carrying the pre-adjustment
/// value so callers can derive threshold-crossing signals
#[derive(Debug, Clone)]
pub struct SpentAdjustment {
    pub spent_before: Money,
    pub envelope: Envelope,
}

type EnvelopeMap = HashMap<EnvelopeKey, Envelope>;

/// Repository for envelope persistence and atomic balance arithmetic
pub struct EnvelopeRepository {
    path: PathBuf,
    envelopes: RwLock<EnvelopeMap>,
}

impl EnvelopeRepository {
    /// Create a new envelope repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            envelopes: RwLock::new(HashMap::new()),
        }
    }

    fn read_guard(&self) -> LedgerResult<RwLockReadGuard<'_, EnvelopeMap>> {
        self.envelopes
            .read()
            .map_err(|e| LedgerError::Storage(format!("read lock poisoned: {}", e)))
    }

    fn write_guard(&self) -> LedgerResult<RwLockWriteGuard<'_, EnvelopeMap>> {
        self.envelopes
            .write()
            .map_err(|e| LedgerError::Storage(format!("write lock poisoned: {}", e)))
    }

    /// Load envelopes from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: EnvelopeData = read_json(&self.path)?;

        let mut envelopes = self.write_guard()?;
        envelopes.clear();
        for envelope in file_data.envelopes {
            let key = EnvelopeKey::new(envelope.month, envelope.id);
            envelopes.insert(key, envelope);
        }

        Ok(())
    }

    /// Save envelopes to disk
    pub fn save(&self) -> LedgerResult<()> {
        let envelopes = self.read_guard()?;

        let mut list: Vec<_> = envelopes.values().cloned().collect();
        list.sort_by(|a, b| a.month.cmp(&b.month).then_with(|| a.name.cmp(&b.name)));

        let file_data = EnvelopeData { envelopes: list };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get an envelope snapshot for a month
    pub fn get(&self, month: MonthKey, envelope_id: EnvelopeId) -> LedgerResult<Option<Envelope>> {
        let envelopes = self.read_guard()?;
        Ok(envelopes
            .get(&EnvelopeKey::new(month, envelope_id))
            .cloned())
    }

    /// Get all envelopes for a month, sorted by name
    pub fn list_month(&self, month: MonthKey) -> LedgerResult<Vec<Envelope>> {
        let envelopes = self.read_guard()?;
        let mut list: Vec<_> = envelopes
            .values()
            .filter(|e| e.month == month)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    /// Count the envelopes in a month
    pub fn count_month(&self, month: MonthKey) -> LedgerResult<usize> {
        let envelopes = self.read_guard()?;
        Ok(envelopes.values().filter(|e| e.month == month).count())
    }

    /// Check whether any month carries an envelope with this id
    pub fn contains_id(&self, envelope_id: EnvelopeId) -> LedgerResult<bool> {
        let envelopes = self.read_guard()?;
        Ok(envelopes.keys().any(|k| k.envelope_id == envelope_id))
    }

    /// Total allocated across all envelopes of a month
    pub fn total_allocated(&self, month: MonthKey) -> LedgerResult<Money> {
        let envelopes = self.read_guard()?;
        Ok(total_allocated_locked(&envelopes, month))
    }

    /// Insert or replace an envelope snapshot
    pub fn upsert(&self, envelope: Envelope) -> LedgerResult<()> {
        let mut envelopes = self.write_guard()?;
        let key = EnvelopeKey::new(envelope.month, envelope.id);
        envelopes.insert(key, envelope);
        Ok(())
    }

    /// Remove an envelope snapshot, returning it
    pub fn remove(&self, month: MonthKey, envelope_id: EnvelopeId) -> LedgerResult<Envelope> {
        let mut envelopes = self.write_guard()?;
        envelopes
            .remove(&EnvelopeKey::new(month, envelope_id))
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))
    }

    /// Conditionally adjust an envelope's `allocated` by `delta`, atomically
    ///
    /// For positive deltas, `budget_cap` (when given) bounds the month-wide
    /// allocation total - the check runs against committed state inside the
    /// lock, so racing allocations cannot jointly exceed it. For negative
    /// deltas the envelope's own unspent allocation is the bound: money
    /// already spent cannot be deallocated.
    pub fn adjust_allocated(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        delta: Money,
        budget_cap: Option<Money>,
    ) -> LedgerResult<Envelope> {
        let mut envelopes = self.write_guard()?;

        let key = EnvelopeKey::new(month, envelope_id);
        let envelope = envelopes
            .get(&key)
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))?;

        if delta.is_positive() {
            if let Some(cap) = budget_cap {
                let total = total_allocated_locked(&envelopes, month);
                let available = cap - total;
                if delta > available {
                    return Err(LedgerError::InsufficientFunds {
                        envelope: envelope.name.clone(),
                        requested: delta,
                        available: available.max(Money::zero()),
                    });
                }
            }
        } else {
            let available = envelope.available();
            if -delta > available {
                return Err(LedgerError::InsufficientFunds {
                    envelope: envelope.name.clone(),
                    requested: -delta,
                    available: available.max(Money::zero()),
                });
            }
        }

        let envelope = envelopes
            .get_mut(&key)
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))?;
        envelope.allocated += delta;
        envelope.updated_at = Utc::now();
        Ok(envelope.clone())
    }

    /// Adjust an envelope's `spent` by `delta`, atomically
    ///
    /// Overspend is permitted (surfaced as a signal by callers, never
    /// blocked); a reversal that would drive `spent` below zero means the
    /// ledger and its transactions disagree and is rejected.
    pub fn adjust_spent(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        delta: Money,
    ) -> LedgerResult<SpentAdjustment> {
        let mut envelopes = self.write_guard()?;

        let key = EnvelopeKey::new(month, envelope_id);
        let envelope = envelopes
            .get_mut(&key)
            .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))?;

        let spent_before = envelope.spent;
        let new_spent = spent_before + delta;
        if new_spent.is_negative() {
            return Err(LedgerError::InconsistentState(format!(
                "reversing {} from envelope '{}' would leave spent negative",
                delta.abs(),
                envelope.name
            )));
        }

        envelope.spent = new_spent;
        envelope.updated_at = Utc::now();
        Ok(SpentAdjustment {
            spent_before,
            envelope: envelope.clone(),
        })
    }

    /// Apply several `spent` deltas as one atomic commit
    ///
    /// Used when moving a transaction between envelopes or redistributing a
    /// split: old effects reverse and new effects apply under one write
    /// guard, so no reader observes the intermediate state. Validates every
    /// move before applying any of them.
    pub fn commit_spent_moves(
        &self,
        moves: &[(MonthKey, EnvelopeId, Money)],
    ) -> LedgerResult<Vec<Envelope>> {
        let mut envelopes = self.write_guard()?;

        // Validate: all envelopes exist and no projected spent goes negative
        let mut projected: HashMap<EnvelopeKey, Money> = HashMap::new();
        let mut order: Vec<EnvelopeKey> = Vec::new();
        for (month, envelope_id, delta) in moves {
            let key = EnvelopeKey::new(*month, *envelope_id);
            let envelope = envelopes
                .get(&key)
                .ok_or_else(|| LedgerError::envelope_not_found(envelope_id.to_string()))?;
            let entry = projected.entry(key).or_insert_with(|| {
                order.push(key);
                envelope.spent
            });
            *entry += *delta;
        }
        for key in &order {
            if projected[key].is_negative() {
                let name = envelopes
                    .get(key)
                    .map(|e| e.name.clone())
                    .unwrap_or_default();
                return Err(LedgerError::InconsistentState(format!(
                    "spent reversal for envelope '{}' would leave it negative",
                    name
                )));
            }
        }

        // Apply
        let now = Utc::now();
        let mut updated = Vec::with_capacity(order.len());
        for key in order {
            if let Some(envelope) = envelopes.get_mut(&key) {
                envelope.spent = projected[&key];
                envelope.updated_at = now;
                updated.push(envelope.clone());
            }
        }
        Ok(updated)
    }

    /// Apply several `allocated` deltas as one atomic commit
    ///
    /// Used by transfers: the source's unspent-allocation bound is checked
    /// against committed state, then both sides move under one write guard.
    pub fn commit_allocation_moves(
        &self,
        moves: &[(MonthKey, EnvelopeId, Money)],
    ) -> LedgerResult<Vec<Envelope>> {
        let mut envelopes = self.write_guard()?;

        // Net delta per envelope
        let mut net: HashMap<EnvelopeKey, Money> = HashMap::new();
        let mut order: Vec<EnvelopeKey> = Vec::new();
        for (month, envelope_id, delta) in moves {
            let key = EnvelopeKey::new(*month, *envelope_id);
            if !envelopes.contains_key(&key) {
                return Err(LedgerError::envelope_not_found(envelope_id.to_string()));
            }
            let entry = net.entry(key).or_insert_with(|| {
                order.push(key);
                Money::zero()
            });
            *entry += *delta;
        }

        // Validate: only unspent allocation may leave an envelope
        for key in &order {
            let delta = net[key];
            if delta.is_negative() {
                let envelope = &envelopes[key];
                let available = envelope.available();
                if -delta > available {
                    return Err(LedgerError::InsufficientFunds {
                        envelope: envelope.name.clone(),
                        requested: -delta,
                        available: available.max(Money::zero()),
                    });
                }
            }
        }

        // Apply
        let now = Utc::now();
        let mut updated = Vec::with_capacity(order.len());
        for key in order {
            if let Some(envelope) = envelopes.get_mut(&key) {
                envelope.allocated += net[&key];
                envelope.updated_at = now;
                updated.push(envelope.clone());
            }
        }
        Ok(updated)
    }

    /// Insert a whole month's envelope set as one atomic commit
    ///
    /// Used by the rollover engine: the target month's copy-set lands as a
    /// unit or not at all.
    pub fn insert_month_batch(&self, batch: Vec<Envelope>) -> LedgerResult<()> {
        let mut envelopes = self.write_guard()?;
        for envelope in batch {
            let key = EnvelopeKey::new(envelope.month, envelope.id);
            envelopes.insert(key, envelope);
        }
        Ok(())
    }
}

fn total_allocated_locked(envelopes: &EnvelopeMap, month: MonthKey) -> Money {
    envelopes
        .values()
        .filter(|e| e.month == month)
        .map(|e| e.allocated)
        .sum()
}
