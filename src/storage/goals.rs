//! Savings goal repository
//!
//! Goals are keyed 1:1 by their envelope's id and persist across months.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, SavingsGoal};

use super::file_io::{read_json, write_json_atomic};

/// Serializable goal data
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct GoalData {
    #[serde(default)]
    goals: Vec<SavingsGoal>,
}

type GoalMap = HashMap<EnvelopeId, SavingsGoal>;

/// Repository for savings goal persistence
pub struct GoalRepository {
    path: PathBuf,
    goals: RwLock<GoalMap>,
}

impl GoalRepository {
    /// Create a new goal repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            goals: RwLock::new(HashMap::new()),
        }
    }

    fn read_guard(&self) -> LedgerResult<RwLockReadGuard<'_, GoalMap>> {
        self.goals
            .read()
            .map_err(|e| LedgerError::Storage(format!("read lock poisoned: {}", e)))
    }

    fn write_guard(&self) -> LedgerResult<RwLockWriteGuard<'_, GoalMap>> {
        self.goals
            .write()
            .map_err(|e| LedgerError::Storage(format!("write lock poisoned: {}", e)))
    }

    /// Load goals from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: GoalData = read_json(&self.path)?;

        let mut goals = self.write_guard()?;
        goals.clear();
        for goal in file_data.goals {
            goals.insert(goal.envelope_id, goal);
        }

        Ok(())
    }

    /// Save goals to disk
    pub fn save(&self) -> LedgerResult<()> {
        let goals = self.read_guard()?;

        let mut list: Vec<_> = goals.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let file_data = GoalData { goals: list };
        write_json_atomic(&self.path, &file_data)
    }

    /// Get the goal attached to an envelope
    pub fn get(&self, envelope_id: EnvelopeId) -> LedgerResult<Option<SavingsGoal>> {
        let goals = self.read_guard()?;
        Ok(goals.get(&envelope_id).cloned())
    }

    /// Check whether an envelope has a goal attached
    pub fn contains(&self, envelope_id: EnvelopeId) -> LedgerResult<bool> {
        let goals = self.read_guard()?;
        Ok(goals.contains_key(&envelope_id))
    }

    /// Insert or replace a goal
    pub fn upsert(&self, goal: SavingsGoal) -> LedgerResult<()> {
        let mut goals = self.write_guard()?;
        goals.insert(goal.envelope_id, goal);
        Ok(())
    }

    /// Remove a goal, returning it
    pub fn remove(&self, envelope_id: EnvelopeId) -> LedgerResult<SavingsGoal> {
        let mut goals = self.write_guard()?;
        goals
            .remove(&envelope_id)
            .ok_or_else(|| LedgerError::goal_not_found(envelope_id.to_string()))
    }

    /// Get all goals, oldest first
    pub fn list(&self) -> LedgerResult<Vec<SavingsGoal>> {
        let goals = self.read_guard()?;
        let mut list: Vec<_> = goals.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    fn repo() -> (TempDir, GoalRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = GoalRepository::new(temp_dir.path().join("goals.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_one_goal_per_envelope() {
        let (_tmp, repo) = repo();
        let envelope_id = EnvelopeId::new();

        repo.upsert(SavingsGoal::new(envelope_id, Money::from_cents(100000)))
            .unwrap();
        assert!(repo.contains(envelope_id).unwrap());

        // a second upsert replaces, not duplicates
        repo.upsert(SavingsGoal::new(envelope_id, Money::from_cents(50000)))
            .unwrap();
        assert_eq!(repo.list().unwrap().len(), 1);
        assert_eq!(
            repo.get(envelope_id).unwrap().unwrap().target_amount.cents(),
            50000
        );
    }

    #[test]
    fn test_remove() {
        let (_tmp, repo) = repo();
        let envelope_id = EnvelopeId::new();
        repo.upsert(SavingsGoal::new(envelope_id, Money::from_cents(100000)))
            .unwrap();

        repo.remove(envelope_id).unwrap();
        assert!(!repo.contains(envelope_id).unwrap());
        assert!(repo.remove(envelope_id).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let (_tmp, repo) = repo();
        let envelope_id = EnvelopeId::new();
        repo.upsert(SavingsGoal::new(envelope_id, Money::from_cents(100000)))
            .unwrap();
        repo.save().unwrap();

        let repo2 = GoalRepository::new(repo.path.clone());
        repo2.load().unwrap();
        assert!(repo2.contains(envelope_id).unwrap());
    }
}
