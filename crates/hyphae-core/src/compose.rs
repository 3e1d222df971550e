//! Nexus composition: discover where independent organs agree.
//!
//! Every raw atom is normalized to its canonical form; each canonical atom
//! activated by at least two organs above the intersection threshold becomes
//! a [`SemanticNexus`]. Results below the coherence floor are dropped and the
//! rest are ranked by emission readiness.

use std::collections::BTreeMap;

use crate::config::NexusConfig;
use crate::constants::MIN_PARTICIPANTS;
use crate::coupling::CouplingMatrix;
use crate::nexus::{Participant, SemanticNexus};
use crate::organ::ActivationMap;
use crate::synonym::SynonymNormalizer;

/// Raw contribution of one organ atom to a canonical atom.
#[derive(Debug, Clone)]
struct Contribution<'a> {
    organ: &'a str,
    activation: f64,
}

pub struct NexusComposer {
    config: NexusConfig,
    normalizer: SynonymNormalizer,
}

impl NexusComposer {
    pub fn new(config: NexusConfig, normalizer: SynonymNormalizer) -> Self {
        Self { config, normalizer }
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &SynonymNormalizer {
        &self.normalizer
    }

    pub fn compose(&self, maps: &ActivationMap, coupling: &CouplingMatrix) -> Vec<SemanticNexus> {
        // canonical atom -> contributions, in organ order
        let mut by_atom: BTreeMap<String, Vec<Contribution<'_>>> = BTreeMap::new();
        for (organ, atoms) in maps {
            for (atom, &activation) in atoms {
                if !activation.is_finite() {
                    continue;
                }
                by_atom
                    .entry(self.normalizer.normalize(atom))
                    .or_default()
                    .push(Contribution {
                        organ: organ.as_str(),
                        activation: activation.clamp(0.0, 1.0),
                    });
            }
        }

        let mut nexuses: Vec<SemanticNexus> = by_atom
            .into_iter()
            .filter_map(|(atom, contributions)| self.build(atom, &contributions, coupling))
            .filter(|n| n.coherence() >= self.config.coherence_threshold)
            .collect();

        rank(&mut nexuses);
        nexuses
    }

    /// Collapse contributions per organ, apply the participant gate, and
    /// build the nexus.
    fn build(
        &self,
        atom: String,
        contributions: &[Contribution<'_>],
        coupling: &CouplingMatrix,
    ) -> Option<SemanticNexus> {
        let mut per_organ: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for c in contributions {
            per_organ.entry(c.organ).or_default().push(c.activation);
        }

        let participants: Vec<Participant> = per_organ
            .into_iter()
            .map(|(organ, values)| Participant {
                organ: organ.to_string(),
                activation: self.config.merge_policy.merge(&values),
            })
            .filter(|p| p.activation >= self.config.intersection_threshold)
            .collect();

        if participants.len() < MIN_PARTICIPANTS {
            return None;
        }

        Some(SemanticNexus::from_participants(
            atom,
            participants,
            coupling,
            &self.config.weights,
        ))
    }
}

/// Sort by emission readiness, highest first. Ties break on atom name.
pub fn rank(nexuses: &mut [SemanticNexus]) {
    nexuses.sort_by(|a, b| {
        b.emission_readiness()
            .total_cmp(&a.emission_readiness())
            .then_with(|| a.atom().cmp(b.atom()))
    });
}

/// Mean coherence of the nexuses each organ participates in.
pub fn organ_coherences(nexuses: &[SemanticNexus]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for nexus in nexuses {
        for p in nexus.participants() {
            let entry = sums.entry(p.organ.clone()).or_insert((0.0, 0));
            entry.0 += nexus.coherence();
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(organ, (sum, n))| (organ, sum / n as f64))
        .collect()
}
