//! The data directory: every persisted document of one engine instance.
//!
//! ```text
//! <base>/config.toml
//! <base>/coupling.json
//! <base>/synonyms.json
//! <base>/cycle_stats.json
//! <base>/gate_stats.json
//! <base>/decision_quality.json
//! <base>/journal.db
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hyphae_core::{EngineConfig, HyphaeEngine, Organ, SynonymConfig, default_groups};

use crate::config::{load_config_or_default, save_config};
use crate::coupling::CouplingStore;
use crate::error::Result;
use crate::journal::TraceJournal;
use crate::synonyms::{load_normalizer, save_synonyms};
use crate::trackers;

/// `~/.hyphae`, or the working directory when no home is known.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".hyphae")
}

pub struct HyphaeStore {
    base: PathBuf,
}

impl HyphaeStore {
    /// Open (and create) the data directory. `None` means the default.
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn coupling_path(&self) -> PathBuf {
        self.base.join("coupling.json")
    }

    pub fn synonyms_path(&self) -> PathBuf {
        self.base.join("synonyms.json")
    }

    pub fn cycle_stats_path(&self) -> PathBuf {
        self.base.join("cycle_stats.json")
    }

    pub fn gate_stats_path(&self) -> PathBuf {
        self.base.join("gate_stats.json")
    }

    pub fn decision_quality_path(&self) -> PathBuf {
        self.base.join("decision_quality.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.base.join("journal.db")
    }

    /// Write default config and synonym documents where none exist yet.
    pub fn ensure_defaults(&self) -> Result<()> {
        let config = self.config_path();
        if !config.exists() {
            save_config(&config, &EngineConfig::default())?;
            tracing::info!(path = %config.display(), "wrote default config");
        }
        let synonyms = self.synonyms_path();
        if !synonyms.exists() {
            save_synonyms(
                &synonyms,
                &SynonymConfig {
                    groups: default_groups(),
                },
            )?;
            tracing::info!(path = %synonyms.display(), "wrote default synonym groups");
        }
        Ok(())
    }

    pub fn load_config(&self) -> EngineConfig {
        load_config_or_default(&self.config_path())
    }

    pub fn coupling_store(&self, config: &EngineConfig) -> CouplingStore {
        CouplingStore::new(
            self.coupling_path(),
            Organ::roster(),
            config.learning.learning_rate,
        )
    }

    /// Build an engine from whatever is on disk, degrading each document
    /// to its default independently.
    pub fn load_engine(&self) -> Result<HyphaeEngine> {
        let config = self.load_config();
        let coupling = self.coupling_store(&config).load_or_identity()?;
        let normalizer = load_normalizer(&self.synonyms_path());
        let engine = HyphaeEngine::new(config, normalizer, coupling)?.with_trackers(
            trackers::load_cycle_stats(&self.cycle_stats_path()),
            trackers::load_gate_stats(&self.gate_stats_path()),
            trackers::load_decision_quality(&self.decision_quality_path()),
        );
        Ok(engine)
    }

    /// Persist the coupling matrix and every tracker. All documents are
    /// attempted; the first failure is returned.
    pub fn checkpoint(&self, engine: &mut HyphaeEngine) -> Result<()> {
        let results = [
            self.coupling_store(engine.config()).save(engine.coupling()),
            trackers::save_cycle_stats(&self.cycle_stats_path(), engine.cycle_stats()),
            trackers::save_gate_stats(&self.gate_stats_path(), engine.gate_stats()),
            trackers::save_decision_quality(&self.decision_quality_path(), engine.decisions()),
        ];
        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                tracing::warn!("checkpoint write failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                engine.mark_checkpointed();
                tracing::debug!(turns = engine.turns(), "checkpoint written");
                Ok(())
            }
        }
    }

    pub fn open_journal(&self) -> Result<TraceJournal> {
        TraceJournal::open(&self.journal_path())
    }
}
