//! Transaction repository
//!
//! Manages loading, saving, and querying of transactions, including the
//! queries the ledger needs for duplicate detection and split-leg
//! referential-integrity checks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, Money, MonthKey, Transaction, TransactionId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable transaction data
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

type TransactionMap = HashMap<TransactionId, Transaction>;

/// Repository for transaction persistence
pub struct TransactionRepository {
    path: PathBuf,
    transactions: RwLock<TransactionMap>,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            transactions: RwLock::new(HashMap::new()),
        }
    }

    fn read_guard(&self) -> LedgerResult<RwLockReadGuard<'_, TransactionMap>> {
        self.transactions
            .read()
            .map_err(|e| LedgerError::Storage(format!("read lock poisoned: {}", e)))
    }

    fn write_guard(&self) -> LedgerResult<RwLockWriteGuard<'_, TransactionMap>> {
        self.transactions
            .write()
            .map_err(|e| LedgerError::Storage(format!("write lock poisoned: {}", e)))
    }

    /// Load transactions from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: TransactionData = read_json(&self.path)?;

        let mut transactions = self.write_guard()?;
        transactions.clear();
        for txn in file_data.transactions {
            transactions.insert(txn.id, txn);
        }

        Ok(())
    }

    /// Save transactions to disk
    pub fn save(&self) -> LedgerResult<()> {
        let transactions = self.read_guard()?;

        let mut list: Vec<_> = transactions.values().cloned().collect();
        list.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));

        let file_data = TransactionData { transactions: list };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get a transaction by ID
    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        let transactions = self.read_guard()?;
        Ok(transactions.get(&id).cloned())
    }

    /// Insert or replace a transaction
    pub fn upsert(&self, txn: Transaction) -> LedgerResult<()> {
        let mut transactions = self.write_guard()?;
        transactions.insert(txn.id, txn);
        Ok(())
    }

    /// Remove a transaction, returning it
    pub fn remove(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let mut transactions = self.write_guard()?;
        transactions
            .remove(&id)
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))
    }

    /// Get all transactions for a month, newest first
    pub fn list_month(&self, month: MonthKey) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.read_guard()?;
        let mut list: Vec<_> = transactions
            .values()
            .filter(|t| t.month == month)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));
        Ok(list)
    }

    /// Get the transactions touching an envelope in a month, either as the
    /// primary envelope or through a split leg
    pub fn list_for_envelope(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
    ) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.read_guard()?;
        let mut list: Vec<_> = transactions
            .values()
            .filter(|t| t.month == month)
            .filter(|t| {
                if t.is_split() {
                    t.splits.iter().any(|s| s.envelope_id == envelope_id)
                } else {
                    t.envelope_id == envelope_id
                }
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(list)
    }

    /// Sum the spending attributed to an envelope in a month: direct
    /// transactions plus its split-leg shares
    pub fn attributed_spent(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
    ) -> LedgerResult<Money> {
        let transactions = self.read_guard()?;
        let total = transactions
            .values()
            .filter(|t| t.month == month)
            .map(|t| {
                if t.is_split() {
                    t.splits
                        .iter()
                        .filter(|s| s.envelope_id == envelope_id)
                        .map(|s| s.amount)
                        .sum()
                } else if t.envelope_id == envelope_id {
                    t.amount
                } else {
                    Money::zero()
                }
            })
            .sum();
        Ok(total)
    }

    /// Check whether any split transaction in a month references the
    /// envelope through a non-primary leg
    pub fn references_as_split_leg(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
    ) -> LedgerResult<bool> {
        let transactions = self.read_guard()?;
        Ok(transactions.values().any(|t| {
            t.month == month
                && t.envelope_id != envelope_id
                && t.splits.iter().any(|s| s.envelope_id == envelope_id)
        }))
    }

    /// Find a transaction on the same envelope with the same amount created
    /// at or after `since`, excluding `exclude` - the possible-duplicate
    /// heuristic's query
    pub fn find_recent_same_amount(
        &self,
        month: MonthKey,
        envelope_id: EnvelopeId,
        amount: Money,
        since: DateTime<Utc>,
        exclude: TransactionId,
    ) -> LedgerResult<Option<TransactionId>> {
        let transactions = self.read_guard()?;
        Ok(transactions
            .values()
            .filter(|t| {
                t.id != exclude
                    && t.month == month
                    && t.envelope_id == envelope_id
                    && t.amount == amount
                    && t.created_at >= since
            })
            .max_by_key(|t| t.created_at)
            .map(|t| t.id))
    }
}
