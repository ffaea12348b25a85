//! Flat-file persistence for key records.
//!
//! The store is one JSON document (`{"keys": [...]}`) loaded and saved
//! whole — there are no partial updates. Saves write a sibling temp file
//! and rename it into place, so a concurrent reader never observes a
//! half-written document. A missing file reads as an empty store; a corrupt
//! one is logged and also reads as empty, so the process always starts.
//! Unknown fields in the document are dropped on read (lossy policy).

use crate::error::{LifecycleError, LifecycleResult};
use keywarden_types::KeyRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    keys: Vec<KeyRecord>,
}

#[derive(Debug, Serialize)]
struct StoreDocumentRef<'a> {
    keys: &'a [KeyRecord],
}

/// Whole-document store for key records.
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Opens a store at the given path. The file is created on first save.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every record, in stored order.
    ///
    /// Missing file → empty. Corrupt document → empty, logged. Records
    /// violating the kind/expiry invariant are skipped, logged, and the
    /// rest of the document still loads.
    #[must_use]
    pub fn load(&self) -> Vec<KeyRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read record store: {e}");
                return Vec::new();
            }
        };

        let document: StoreDocument = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "record store is corrupt, starting empty: {e}"
                );
                return Vec::new();
            }
        };

        document
            .keys
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("skipping invalid record on load: {e}");
                    false
                }
            })
            .collect()
    }

    /// Replaces the whole document with the given records.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Store` when the document cannot be written;
    /// the previous on-disk document is left intact in that case.
    pub fn save(&self, records: &[KeyRecord]) -> LifecycleResult<()> {
        let body = serde_json::to_vec_pretty(&StoreDocumentRef { keys: records })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| {
            LifecycleError::Store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            LifecycleError::Store(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(count = records.len(), "record store flushed");
        Ok(())
    }
}
