//! Storage layer for the envelope ledger
//!
//! Provides JSON file storage with atomic writes plus the append-only
//! rollover history log. The repositories also own the ledger's atomic
//! balance arithmetic: every conditional increment on `allocated` and
//! `spent` commits inside a repository lock section.

pub mod envelopes;
pub mod events;
pub mod file_io;
pub mod goals;
pub mod incomes;
pub mod rollover_log;
pub mod transactions;

pub use envelopes::{EnvelopeRepository, SpentAdjustment};
pub use events::{ChangeBus, ChangeEvent};
pub use file_io::{read_json, write_json_atomic};
pub use goals::GoalRepository;
pub use incomes::IncomeRepository;
pub use rollover_log::RolloverLog;
pub use transactions::TransactionRepository;

use crate::config::paths::LedgerPaths;
use crate::error::LedgerError;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub envelopes: EnvelopeRepository,
    pub transactions: TransactionRepository,
    pub incomes: IncomeRepository,
    pub goals: GoalRepository,
    pub rollover_log: RolloverLog,
    pub events: ChangeBus,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> Result<Self, LedgerError> {
        // Ensure directories exist
        paths.ensure_directories()?;

        Ok(Self {
            envelopes: EnvelopeRepository::new(paths.envelopes_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            incomes: IncomeRepository::new(paths.incomes_file()),
            goals: GoalRepository::new(paths.goals_file()),
            rollover_log: RolloverLog::new(paths.rollover_log_file()),
            events: ChangeBus::new(),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&mut self) -> Result<(), LedgerError> {
        self.envelopes.load()?;
        self.transactions.load()?;
        self.incomes.load()?;
        self.goals.load()?;
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> Result<(), LedgerError> {
        self.envelopes.save()?;
        self.transactions.save()?;
        self.incomes.save()?;
        self.goals.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();

        assert!(temp_dir.path().join("data").exists());
        storage.load_all().unwrap();
        storage.save_all().unwrap();
    }
}
