//! Persistence for hyphae-core.
//!
//! JSON documents for the coupling matrix, synonym groups and trackers,
//! TOML for engine configuration, SQLite for the trace journal. Every
//! document write goes through a temp file and a rename.

pub mod config;
pub mod coupling;
pub mod document;
pub mod error;
pub mod journal;
pub mod schema;
pub mod synonyms;
pub mod trackers;
pub mod workspace;

pub use config::{load_config, load_config_or_default, save_config};
pub use coupling::CouplingStore;
pub use error::{Result, StoreError};
pub use journal::{JournalSummary, TraceJournal, TurnSummary};
pub use synonyms::{load_normalizer, load_synonyms, save_synonyms};
pub use workspace::{HyphaeStore, default_base_dir};
