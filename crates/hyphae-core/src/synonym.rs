//! Synonym normalization: raw atom names → canonical atoms.
//!
//! Lookup order is exact match, then case-folded, then case-folded with
//! underscores read as spaces. Anything unmatched passes through unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One canonical term and the synonyms that collapse onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl SynonymGroup {
    pub fn new(canonical: &str, synonyms: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// On-disk shape of the synonym configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymConfig {
    #[serde(default, alias = "synonym_groups")]
    pub groups: Vec<SynonymGroup>,
}

#[derive(Debug, Clone, Default)]
pub struct SynonymNormalizer {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl SynonymNormalizer {
    /// Normalizer that maps every atom to itself.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: &[SynonymGroup]) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();

        for group in groups {
            let canonical = group.canonical.trim();
            if canonical.is_empty() {
                continue;
            }
            let terms = std::iter::once(canonical).chain(group.synonyms.iter().map(|s| s.trim()));
            for term in terms.filter(|t| !t.is_empty()) {
                // First group to claim a term wins.
                exact
                    .entry(term.to_string())
                    .or_insert_with(|| canonical.to_string());
                folded
                    .entry(fold(term))
                    .or_insert_with(|| canonical.to_string());
            }
        }

        Self { exact, folded }
    }

    pub fn normalize(&self, atom: &str) -> String {
        if let Some(canonical) = self.exact.get(atom) {
            return canonical.clone();
        }
        let folded = atom.to_lowercase();
        if let Some(canonical) = self.folded.get(&folded) {
            return canonical.clone();
        }
        if let Some(canonical) = self.folded.get(&fold(atom)) {
            return canonical.clone();
        }
        atom.to_string()
    }

    /// Number of distinct terms (canonical and synonym) known.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

fn fold(term: &str) -> String {
    term.to_lowercase().replace('_', " ")
}

/// Built-in groups covering the default lexicon's overlapping vocabulary.
pub fn default_groups() -> Vec<SynonymGroup> {
    vec![
        SynonymGroup::new("sense", &["feel", "feeling", "sensing", "felt"]),
        SynonymGroup::new("safety", &["safe", "secure", "security", "protection"]),
        SynonymGroup::new("connection", &["bond", "attachment", "together", "belonging"]),
        SynonymGroup::new("pattern", &["structure", "shape", "recurring pattern"]),
        SynonymGroup::new("presence", &["here", "now", "grounded", "present moment"]),
        SynonymGroup::new("truth", &["honest", "honesty", "authentic", "real"]),
        SynonymGroup::new("overwhelm", &["overwhelmed", "flooded", "too much"]),
        SynonymGroup::new("more", &["deeper", "further", "expand"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> SynonymNormalizer {
        SynonymNormalizer::from_groups(&default_groups())
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(normalizer().normalize("feel"), "sense");
    }

    #[test]
    fn test_canonical_maps_to_itself() {
        assert_eq!(normalizer().normalize("sense"), "sense");
    }

    #[test]
    fn test_case_folded_match() {
        assert_eq!(normalizer().normalize("Feeling"), "sense");
        assert_eq!(normalizer().normalize("SAFE"), "safety");
    }

    #[test]
    fn test_underscore_match() {
        assert_eq!(normalizer().normalize("present_moment"), "presence");
        assert_eq!(normalizer().normalize("Too_Much"), "overwhelm");
    }

    #[test]
    fn test_unknown_passes_through() {
        assert_eq!(normalizer().normalize("Quasar_X"), "Quasar_X");
    }

    #[test]
    fn test_identity_normalizer() {
        let n = SynonymNormalizer::identity();
        assert!(n.is_empty());
        assert_eq!(n.normalize("feel"), "feel");
    }

    #[test]
    fn test_first_group_wins() {
        let n = SynonymNormalizer::from_groups(&[
            SynonymGroup::new("alpha", &["shared"]),
            SynonymGroup::new("beta", &["shared"]),
        ]);
        assert_eq!(n.normalize("shared"), "alpha");
    }

    #[test]
    fn test_config_parses_alias() {
        let cfg: SynonymConfig = serde_json::from_str(
            r#"{"synonym_groups": [{"canonical": "calm", "synonyms": ["settled"]}]}"#,
        )
        .unwrap();
        let n = SynonymNormalizer::from_groups(&cfg.groups);
        assert_eq!(n.normalize("settled"), "calm");
    }
}
