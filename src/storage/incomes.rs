//! Income repository
//!
//! Manages loading and saving of income records per month.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Income, IncomeId, Money, MonthKey};

use super::file_io::{read_json, write_json_atomic};

/// Serializable income data
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct IncomeData {
    #[serde(default)]
    incomes: Vec<Income>,
}

type IncomeMap = HashMap<IncomeId, Income>;

/// Repository for income persistence
pub struct IncomeRepository {
    path: PathBuf,
    incomes: RwLock<IncomeMap>,
}

impl IncomeRepository {
    /// Create a new income repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            incomes: RwLock::new(HashMap::new()),
        }
    }

    fn read_guard(&self) -> LedgerResult<RwLockReadGuard<'_, IncomeMap>> {
        self.incomes
            .read()
            .map_err(|e| LedgerError::Storage(format!("read lock poisoned: {}", e)))
    }

    fn write_guard(&self) -> LedgerResult<RwLockWriteGuard<'_, IncomeMap>> {
        self.incomes
            .write()
            .map_err(|e| LedgerError::Storage(format!("write lock poisoned: {}", e)))
    }

    /// Load incomes from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: IncomeData = read_json(&self.path)?;

        let mut incomes = self.write_guard()?;
        incomes.clear();
        for income in file_data.incomes {
            incomes.insert(income.id, income);
        }

        Ok(())
    }

    /// Save incomes to disk
    pub fn save(&self) -> LedgerResult<()> {
        let incomes = self.read_guard()?;

        let mut list: Vec<_> = incomes.values().cloned().collect();
        list.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));

        let file_data = IncomeData { incomes: list };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get an income by ID
    pub fn get(&self, id: IncomeId) -> LedgerResult<Option<Income>> {
        let incomes = self.read_guard()?;
        Ok(incomes.get(&id).cloned())
    }

    /// Insert or replace an income
    pub fn upsert(&self, income: Income) -> LedgerResult<()> {
        let mut incomes = self.write_guard()?;
        incomes.insert(income.id, income);
        Ok(())
    }

    /// Remove an income, returning it
    pub fn remove(&self, id: IncomeId) -> LedgerResult<Income> {
        let mut incomes = self.write_guard()?;
        incomes
            .remove(&id)
            .ok_or_else(|| LedgerError::income_not_found(id.to_string()))
    }

    /// Get all incomes for a month, oldest first
    pub fn list_month(&self, month: MonthKey) -> LedgerResult<Vec<Income>> {
        let incomes = self.read_guard()?;
        let mut list: Vec<_> = incomes
            .values()
            .filter(|i| i.month == month)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(list)
    }

    /// Total income received in a month
    pub fn total_for_month(&self, month: MonthKey) -> LedgerResult<Money> {
        let incomes = self.read_guard()?;
        Ok(incomes
            .values()
            .filter(|i| i.month == month)
            .map(|i| i.amount)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn repo() -> (TempDir, IncomeRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = IncomeRepository::new(temp_dir.path().join("incomes.json"));
        (temp_dir, repo)
    }

    fn income(cents: i64, day: u32) -> Income {
        Income::new(
            Money::from_cents(cents),
            "Salary",
            NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
        )
    }

    #[test]
    fn test_total_for_month() {
        let (_tmp, repo) = repo();
        repo.upsert(income(200000, 1)).unwrap();
        repo.upsert(income(30000, 15)).unwrap();

        let month = MonthKey::new(2025, 1);
        assert_eq!(repo.total_for_month(month).unwrap().cents(), 230000);
        assert_eq!(repo.total_for_month(month.next()).unwrap(), Money::zero());
    }

    #[test]
    fn test_remove() {
        let (_tmp, repo) = repo();
        let i = income(200000, 1);
        let id = i.id;
        repo.upsert(i).unwrap();

        let removed = repo.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(repo.remove(id).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let (_tmp, repo) = repo();
        let i = income(200000, 1);
        let id = i.id;
        repo.upsert(i).unwrap();
        repo.save().unwrap();

        let repo2 = IncomeRepository::new(repo.path.clone());
        repo2.load().unwrap();
        assert!(repo2.get(id).unwrap().is_some());
    }
}
