//! JSON document form of the coupling matrix.
//!
//! The matrix lives under `r_matrix`, with a `metadata` block beside it. The
//! file may carry other top-level keys owned by someone else; those are the
//! store's concern, and these types only describe the keys written here.

use serde::{Deserialize, Serialize};

use crate::coupling::CouplingMatrix;
use crate::error::{EngineError, Result};

pub const MATRIX_KEY: &str = "r_matrix";
pub const METADATA_KEY: &str = "metadata";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingMetadata {
    pub shape: [usize; 2],
    pub learning_rate: f64,
    #[serde(default)]
    pub total_updates: u64,
    /// Row/column names. Absent in legacy documents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organs: Vec<String>,
    #[serde(default)]
    pub saved_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingDocument {
    pub r_matrix: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CouplingMetadata>,
}

impl CouplingDocument {
    pub fn from_matrix(matrix: &CouplingMatrix, learning_rate: f64, saved_at: String) -> Self {
        let k = matrix.size();
        Self {
            r_matrix: matrix.values().to_vec(),
            metadata: Some(CouplingMetadata {
                shape: [k, k],
                learning_rate,
                total_updates: matrix.total_updates(),
                organs: matrix.organs().to_vec(),
                saved_at,
            }),
        }
    }

    /// Rebuild a matrix over `roster`.
    ///
    /// Named documents are matched by organ name, so organs missing from the
    /// document start at identity and organs the roster lacks are dropped.
    /// Unnamed documents are positional: same size loads directly, smaller
    /// sizes embed into the upper-left block, larger sizes are rejected.
    pub fn into_matrix(self, roster: Vec<String>) -> Result<CouplingMatrix> {
        let total_updates = self.metadata.as_ref().map(|m| m.total_updates).unwrap_or(0);
        let names = self
            .metadata
            .map(|m| m.organs)
            .filter(|organs| !organs.is_empty());

        let mut matrix = match names {
            Some(names) if names.len() == self.r_matrix.len() => {
                let stored = CouplingMatrix::from_values(names, self.r_matrix)?;
                let mut matrix = CouplingMatrix::identity(roster)?;
                matrix.merge_by_name(&stored);
                matrix
            }
            Some(names) => {
                return Err(EngineError::ShapeMismatch {
                    expected: names.len(),
                    found: self.r_matrix.len(),
                });
            }
            None if self.r_matrix.len() == roster.len() => {
                CouplingMatrix::from_values(roster, self.r_matrix)?
            }
            None => CouplingMatrix::embed_legacy(roster, &self.r_matrix)?,
        };
        matrix.set_total_updates(total_updates);
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organ::Organ;

    #[test]
    fn test_document_round_trip() {
        let mut m = CouplingMatrix::default_roster();
        m.set(0, 1, 0.25);
        m.set(3, 7, 0.5);
        m.set_total_updates(12);

        let doc = CouplingDocument::from_matrix(&m, 0.05, "2026-01-01T00:00:00Z".into());
        let json = serde_json::to_string(&doc).unwrap();
        let back: CouplingDocument = serde_json::from_str(&json).unwrap();
        let loaded = back.into_matrix(Organ::roster()).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn test_legacy_document_embeds() {
        let doc: CouplingDocument = serde_json::from_str(
            r#"{"r_matrix": [[1.0, 0.3], [0.3, 1.0]]}"#,
        )
        .unwrap();
        let m = doc.into_matrix(Organ::roster()).unwrap();
        assert_eq!(m.size(), 11);
        assert_eq!(m.at(0, 1).unwrap(), 0.3);
        assert_eq!(m.at(5, 5).unwrap(), 1.0);
        assert_eq!(m.at(5, 6).unwrap(), 0.0);
    }

    #[test]
    fn test_named_document_matches_by_name() {
        let doc = CouplingDocument {
            r_matrix: vec![vec![1.0, 0.4], vec![0.4, 1.0]],
            metadata: Some(CouplingMetadata {
                shape: [2, 2],
                learning_rate: 0.05,
                total_updates: 3,
                organs: vec!["BOND".into(), "EMPATHY".into()],
                saved_at: String::new(),
            }),
        };
        let m = doc.into_matrix(Organ::roster()).unwrap();
        assert_eq!(m.get("EMPATHY", "BOND"), 0.4);
        assert_eq!(m.get("LISTENING", "EMPATHY"), 0.0);
        assert_eq!(m.total_updates(), 3);
    }

    #[test]
    fn test_oversized_unnamed_document_rejected() {
        let doc = CouplingDocument {
            r_matrix: vec![vec![1.0; 12]; 12],
            metadata: None,
        };
        assert!(matches!(
            doc.into_matrix(Organ::roster()),
            Err(EngineError::ShapeMismatch { .. })
        ));
    }
}
