//! Persistent cookie storage.
//!
//! Session cookies are written as a pretty-printed JSON array at a fixed path
//! inside the data directory. Presence of the file is the sole signal that a
//! previous login succeeded; staleness is detected by probing, never assumed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::CookieRecord;

/// Errors for persisted cookie storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// On-disk store for captured session cookies.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads persisted cookies from disk.
    ///
    /// Returns `Ok(None)` when no cookie file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading or parsing the file fails.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<Vec<CookieRecord>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let records: Vec<CookieRecord> = serde_json::from_str(&contents)?;
        debug!(count = records.len(), "loaded persisted cookies");
        Ok(Some(records))
    }

    /// Persists the given cookies, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when creating the parent directory or writing
    /// the file fails.
    #[instrument(level = "debug", skip(self, records), fields(path = %self.path.display()))]
    pub fn save(&self, records: &[CookieRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        debug!(count = records.len(), "persisted cookies");
        Ok(())
    }

    /// Deletes the cookie file.
    ///
    /// Returns `true` when a file existed and was removed, `false` when there
    /// was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file exists but cannot be removed.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn clear(&self) -> Result<bool, StoreError> {
        if !self.path.exists() {
            return Ok(false);
        }

        fs::remove_file(&self.path)?;
        debug!("cleared persisted cookies");
        Ok(true)
    }
}
