//! Synonym group documents.

use std::path::Path;

use hyphae_core::{SynonymConfig, SynonymNormalizer};

use crate::document::{read_json, write_json};
use crate::error::{Result, StoreError};

pub fn load_synonyms(path: &Path) -> Result<SynonymConfig> {
    read_json(path)
}

pub fn save_synonyms(path: &Path, config: &SynonymConfig) -> Result<()> {
    write_json(path, config)
}

/// Normalizer from `path`. A missing or unreadable file degrades to the
/// identity mapping.
pub fn load_normalizer(path: &Path) -> SynonymNormalizer {
    match load_synonyms(path) {
        Ok(config) => SynonymNormalizer::from_groups(&config.groups),
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no synonym file, atoms compare as-is");
            SynonymNormalizer::identity()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "synonym file unreadable, atoms compare as-is: {e}");
            SynonymNormalizer::identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyphae_core::default_groups;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_identity() {
        let dir = TempDir::new().unwrap();
        let n = load_normalizer(&dir.path().join("synonyms.json"));
        assert!(n.is_empty());
        assert_eq!(n.normalize("feel"), "feel");
    }

    #[test]
    fn test_groups_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synonyms.json");
        save_synonyms(
            &path,
            &SynonymConfig {
                groups: default_groups(),
            },
        )
        .unwrap();
        assert_eq!(load_normalizer(&path).normalize("Feeling"), "sense");
    }

    #[test]
    fn test_legacy_key_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synonyms.json");
        std::fs::write(
            &path,
            r#"{"synonym_groups": [{"canonical": "safety", "synonyms": ["safe"]}]}"#,
        )
        .unwrap();
        assert_eq!(load_normalizer(&path).normalize("safe"), "safety");
    }

    #[test]
    fn test_garbage_is_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synonyms.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_normalizer(&path).is_empty());
    }
}
