//! JSON persistence helpers
//!
//! Reads tolerate a missing file (a fresh ledger starts empty); writes go
//! through a uniquely named temp file in the target directory followed by a
//! rename, so a crash mid-save leaves the previous contents intact and
//! concurrent savers cannot trample each other's temp files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::LedgerError;

static TEMP_NONCE: AtomicU64 = AtomicU64::new(0);

/// Load a JSON file, falling back to `T::default()` when it does not exist
pub fn read_json<T, P>(path: P) -> Result<T, LedgerError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(LedgerError::Storage(format!(
                "reading {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| LedgerError::Storage(format!("parsing {}: {}", path.display(), e)))
}

/// Replace a JSON file's contents atomically
///
/// The document is serialized up front, written to a temp file alongside the
/// target, synced, and renamed into place. Readers see either the old file or
/// the new one, never a partial write.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), LedgerError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!("creating {}: {}", parent.display(), e))
        })?;
    }

    let body = serde_json::to_vec_pretty(data)
        .map_err(|e| LedgerError::Storage(format!("serializing {}: {}", path.display(), e)))?;

    // Temp name unique per process and per write; same directory as the
    // target so the rename stays atomic
    let nonce = TEMP_NONCE.fetch_add(1, Ordering::Relaxed);
    let temp_path = path.with_extension(format!("tmp-{}-{}", std::process::id(), nonce));

    let write_temp = || -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(&body)?;
        file.sync_all()
    };

    if let Err(e) = write_temp() {
        let _ = fs::remove_file(&temp_path);
        return Err(LedgerError::Storage(format!(
            "writing {}: {}",
            temp_path.display(),
            e
        )));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::Storage(format!("replacing {}: {}", path.display(), e))
    })
}
