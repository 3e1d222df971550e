//! Coupling matrix persistence.
//!
//! The JSON file may be shared with other writers, so saving merges the
//! matrix keys into whatever object is already there. Loading has a strict
//! form that returns every failure and a lenient form that falls back to
//! identity for anything short of an organ-name collision.

use std::fs;
use std::path::{Path, PathBuf};

use hyphae_core::time::{compact_now, iso8601_now};
use hyphae_core::wire::{MATRIX_KEY, METADATA_KEY};
use hyphae_core::{CouplingDocument, CouplingMatrix};
use serde_json::{Map, Value};

use crate::document::{read_json, sibling, write_json};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct CouplingStore {
    path: PathBuf,
    roster: Vec<String>,
    learning_rate: f64,
}

impl CouplingStore {
    pub fn new(path: impl Into<PathBuf>, roster: Vec<String>, learning_rate: f64) -> Self {
        Self {
            path: path.into(),
            roster,
            learning_rate,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Load, reporting every failure.
    pub fn load(&self) -> Result<CouplingMatrix> {
        let doc: CouplingDocument = read_json(&self.path)?;
        Ok(doc.into_matrix(self.roster.clone())?)
    }

    /// Load, falling back to identity when the file is missing, corrupt or
    /// shaped wrong. Only a duplicate organ name in the configured roster is
    /// an error; the same defect inside the document is just a bad file.
    pub fn load_or_identity(&self) -> Result<CouplingMatrix> {
        let identity = self.identity()?;
        match self.load() {
            Ok(matrix) => Ok(matrix),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no coupling matrix yet, starting from identity");
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "coupling matrix unreadable, using identity: {e}");
                Ok(identity)
            }
        }
    }

    fn identity(&self) -> Result<CouplingMatrix> {
        Ok(CouplingMatrix::identity(self.roster.clone())?)
    }

    /// Write the matrix and metadata, keeping any other top-level keys.
    pub fn save(&self, matrix: &CouplingMatrix) -> Result<()> {
        let mut root = self.existing_object()?;
        let doc = CouplingDocument::from_matrix(matrix, self.learning_rate, iso8601_now());
        root.insert(MATRIX_KEY.to_string(), serde_json::to_value(&doc.r_matrix)?);
        root.insert(METADATA_KEY.to_string(), serde_json::to_value(&doc.metadata)?);
        write_json(&self.path, &Value::Object(root))?;
        tracing::debug!(
            path = %self.path.display(),
            total_updates = matrix.total_updates(),
            "coupling matrix saved"
        );
        Ok(())
    }

    /// Top-level keys of the current file. A file that cannot be read as a
    /// JSON object is copied to a backup before it gets replaced.
    fn existing_object(&self) -> Result<Map<String, Value>> {
        let reason = match read_json::<Value>(&self.path) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(_) => "not a JSON object".to_string(),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Map::new());
            }
            Err(e) => e.to_string(),
        };
        let backup = self.backup_path();
        fs::copy(&self.path, &backup)?;
        tracing::warn!(
            path = %self.path.display(),
            backup = %backup.display(),
            "coupling file unreadable ({reason}), replacing it"
        );
        Ok(Map::new())
    }

    /// Copy the current file to a timestamped backup, reset the matrix to
    /// identity, and save it. Returns the backup path when a file existed.
    pub fn backup_and_reset(&self, matrix: &mut CouplingMatrix) -> Result<Option<PathBuf>> {
        let backup = if self.path.exists() {
            let target = self.backup_path();
            fs::copy(&self.path, &target)?;
            tracing::info!(backup = %target.display(), "coupling matrix backed up");
            Some(target)
        } else {
            None
        };
        matrix.reset();
        self.save(matrix)?;
        Ok(backup)
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = compact_now();
        let mut candidate = sibling(&self.path, &format!("{stamp}.bak"));
        let mut n = 1;
        while candidate.exists() {
            candidate = sibling(&self.path, &format!("{stamp}-{n}.bak"));
            n += 1;
        }
        candidate
    }
}
