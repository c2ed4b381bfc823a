//! Path management for the envelope ledger
//!
//! Provides XDG-compliant path resolution for ledger data, scoped per
//! tenancy so that every household (or solo user) gets its own data
//! directory.
//!
//! ## Path Resolution Order
//!
//! 1. `ENVELOPE_LEDGER_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/envelope-ledger` or
//!    `~/.config/envelope-ledger`
//! 3. Windows: `%APPDATA%\envelope-ledger`

use std::path::PathBuf;

use crate::error::LedgerError;

/// Opaque tenancy keys under which all ledger data is read and written
///
/// The ledger does not interpret these beyond using them to isolate one
/// household's files from another's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub user_id: String,
    pub household_id: Option<String>,
}

impl Scope {
    /// Scope for a user budgeting alone
    pub fn solo(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            household_id: None,
        }
    }

    /// Scope for a user budgeting within a shared household
    pub fn household(user_id: impl Into<String>, household_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            household_id: Some(household_id.into()),
        }
    }

    /// The key all ledger data for this scope lives under
    pub fn tenancy_key(&self) -> String {
        match &self.household_id {
            Some(household) => household.clone(),
            None => format!("solo-{}", self.user_id),
        }
    }
}

/// Manages all paths used by the ledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    /// Base directory for all ledger data
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Create a new LedgerPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, LedgerError> {
        let base_dir = if let Ok(custom) = std::env::var("ENVELOPE_LEDGER_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create LedgerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the paths for one tenancy scope, rooted under this base
    pub fn scoped(&self, scope: &Scope) -> Self {
        Self {
            base_dir: self.base_dir.join("households").join(scope.tenancy_key()),
        }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to envelopes.json
    pub fn envelopes_file(&self) -> PathBuf {
        self.data_dir().join("envelopes.json")
    }

    /// Get the path to transactions.json
    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Get the path to incomes.json
    pub fn incomes_file(&self) -> PathBuf {
        self.data_dir().join("incomes.json")
    }

    /// Get the path to goals.json
    pub fn goals_file(&self) -> PathBuf {
        self.data_dir().join("goals.json")
    }

    /// Get the path to the append-only rollover history log
    pub fn rollover_log_file(&self) -> PathBuf {
        self.base_dir.join("rollover.log")
    }

    /// Ensure the data directory (and everything above it) exists
    pub fn ensure_directories(&self) -> Result<(), LedgerError> {
        let data_dir = self.data_dir();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| LedgerError::Io(format!("creating {}: {}", data_dir.display(), e)))
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, LedgerError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("envelope-ledger"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| LedgerError::Io("could not determine the home directory".into()))?;
    Ok(PathBuf::from(home).join(".config").join("envelope-ledger"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, LedgerError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| LedgerError::Io("could not determine the APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("envelope-ledger"))
}
