//! Append-only rollover history log
//!
//! Records every carry-over performed by a month advance as a single JSON
//! line (JSONL). Entries are written once and never mutated; the log also
//! serves as the guard against advancing the same month twice.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EnvelopeId, MonthKey, RolloverHistoryEntry};

/// Handles writing rollover history entries to the log file
pub struct RolloverLog {
    /// Path to the log file
    log_path: PathBuf,
}

impl RolloverLog {
    /// Create a new RolloverLog that writes to the specified path
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append a batch of history entries
    ///
    /// Writes all entries and flushes once at the end. Callers append only
    /// after the corresponding envelope copy-set has committed, so a partial
    /// advance never leaves durable history behind.
    pub fn append_batch(&self, entries: &[RolloverHistoryEntry]) -> LedgerResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("opening rollover log: {}", e)))?;

        for entry in entries {
            let json = serde_json::to_string(entry).map_err(|e| {
                LedgerError::Json(format!("serializing rollover entry: {}", e))
            })?;

            writeln!(file, "{}", json)
                .map_err(|e| LedgerError::Io(format!("appending rollover entry: {}", e)))?;
        }

        file.flush()
            .map_err(|e| LedgerError::Io(format!("flushing rollover log: {}", e)))?;

        Ok(())
    }

    /// Read all history entries in chronological order (oldest first)
    pub fn read_all(&self) -> LedgerResult<Vec<RolloverHistoryEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("opening rollover log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                LedgerError::Io(format!(
                    "reading rollover log line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            let entry: RolloverHistoryEntry = serde_json::from_str(&line).map_err(|e| {
                LedgerError::Json(format!(
                    "parsing rollover log line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Check whether an advance from `source` to `target` was already logged
    pub fn has_advance(&self, source: MonthKey, target: MonthKey) -> LedgerResult<bool> {
        Ok(self
            .read_all()?
            .iter()
            .any(|e| e.source_month == source && e.target_month == target))
    }

    /// Get the history of one envelope, oldest first
    pub fn entries_for_envelope(
        &self,
        envelope_id: EnvelopeId,
    ) -> LedgerResult<Vec<RolloverHistoryEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.envelope_id == envelope_id)
            .collect())
    }
}
