use serde::Serialize;

use crate::config::ReadinessWeights;
use crate::coupling::CouplingMatrix;

/// One organ's contribution to a nexus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub organ: String,
    pub activation: f64,
}

/// The four agreement scalars a nexus is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NexusScalars {
    /// Mean participant activation.
    pub field_strength: f64,
    /// `1 - population_std(activations)`, clamped to [0, 1].
    pub coherence: f64,
    /// Mean pairwise activation product.
    pub intersection_strength: f64,
    /// Mean pairwise activation product weighted by organ coupling.
    pub coupling_weight: f64,
}

impl NexusScalars {
    pub fn from_participants(participants: &[Participant], coupling: &CouplingMatrix) -> Self {
        let activations: Vec<f64> = participants.iter().map(|p| p.activation).collect();

        let mut product_sum = 0.0;
        let mut coupled_sum = 0.0;
        let mut pairs = 0usize;
        for (a, p1) in participants.iter().enumerate() {
            for p2 in &participants[a + 1..] {
                let product = p1.activation * p2.activation;
                product_sum += product;
                coupled_sum += coupling.get(&p1.organ, &p2.organ) * product;
                pairs += 1;
            }
        }
        let (intersection_strength, coupling_weight) = if pairs == 0 {
            (0.0, 0.0)
        } else {
            (product_sum / pairs as f64, coupled_sum / pairs as f64)
        };

        Self {
            field_strength: mean(&activations),
            coherence: coherence(&activations),
            intersection_strength,
            coupling_weight,
        }
    }

    pub fn readiness(&self, weights: &ReadinessWeights) -> f64 {
        weights.score(
            self.coherence,
            self.intersection_strength,
            self.field_strength,
            self.coupling_weight,
        )
    }
}

/// Organs agreeing on one canonical atom.
///
/// Emission readiness is derived from the scalars at construction and has
/// no setter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticNexus {
    atom: String,
    participants: Vec<Participant>,
    #[serde(flatten)]
    scalars: NexusScalars,
    emission_readiness: f64,
}

impl SemanticNexus {
    pub fn new(
        atom: impl Into<String>,
        participants: Vec<Participant>,
        scalars: NexusScalars,
        weights: &ReadinessWeights,
    ) -> Self {
        Self {
            atom: atom.into(),
            participants,
            emission_readiness: scalars.readiness(weights),
            scalars,
        }
    }

    /// Build from participant activations, computing every scalar.
    pub fn from_participants(
        atom: impl Into<String>,
        participants: Vec<Participant>,
        coupling: &CouplingMatrix,
        weights: &ReadinessWeights,
    ) -> Self {
        let scalars = NexusScalars::from_participants(&participants, coupling);
        Self::new(atom, participants, scalars, weights)
    }

    pub fn atom(&self) -> &str {
        &self.atom
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn activation_of(&self, organ: &str) -> Option<f64> {
        self.participants
            .iter()
            .find(|p| p.organ == organ)
            .map(|p| p.activation)
    }

    pub fn scalars(&self) -> &NexusScalars {
        &self.scalars
    }

    pub fn coherence(&self) -> f64 {
        self.scalars.coherence
    }

    pub fn field_strength(&self) -> f64 {
        self.scalars.field_strength
    }

    pub fn intersection_strength(&self) -> f64 {
        self.scalars.intersection_strength
    }

    pub fn coupling_weight(&self) -> f64 {
        self.scalars.coupling_weight
    }

    pub fn emission_readiness(&self) -> f64 {
        self.emission_readiness
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Zero for fewer than two values.
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// `1 - population_std`, clamped to [0, 1]. A single value is fully coherent.
pub fn coherence(values: &[f64]) -> f64 {
    (1.0 - population_std(values)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn participants(pairs: &[(&str, f64)]) -> Vec<Participant> {
        pairs
            .iter()
            .map(|(o, a)| Participant {
                organ: o.to_string(),
                activation: *a,
            })
            .collect()
    }

    fn matrix() -> CouplingMatrix {
        CouplingMatrix::identity(vec!["A".into(), "B".into(), "C".into()]).unwrap()
    }

    #[test]
    fn test_equal_activations_fully_coherent() {
        assert_abs_diff_eq!(coherence(&[0.8, 0.8]), 1.0);
    }

    #[test]
    fn test_spread_activations_coherence() {
        // population std of [0.2, 0.8] is 0.3
        assert_abs_diff_eq!(coherence(&[0.2, 0.8]), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value_coherence() {
        assert_eq!(coherence(&[0.3]), 1.0);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn test_scalars_two_participants() {
        let mut m = matrix();
        m.set(0, 1, 0.5);
        let s = NexusScalars::from_participants(&participants(&[("A", 0.6), ("B", 0.8)]), &m);
        assert_abs_diff_eq!(s.field_strength, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(s.intersection_strength, 0.48, epsilon = 1e-12);
        assert_abs_diff_eq!(s.coupling_weight, 0.24, epsilon = 1e-12);
        assert_abs_diff_eq!(s.coherence, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_scalars_three_participants_normalized_by_pairs() {
        let m = matrix();
        let s = NexusScalars::from_participants(
            &participants(&[("A", 0.5), ("B", 0.5), ("C", 0.5)]),
            &m,
        );
        assert_abs_diff_eq!(s.intersection_strength, 0.25, epsilon = 1e-12);
        // identity matrix: off-diagonal coupling is zero
        assert_eq!(s.coupling_weight, 0.0);
    }

    #[test]
    fn test_unknown_organ_coupling_is_zero() {
        let mut m = matrix();
        m.set(0, 1, 1.0);
        let s = NexusScalars::from_participants(&participants(&[("A", 1.0), ("Q", 1.0)]), &m);
        assert_eq!(s.coupling_weight, 0.0);
        assert_eq!(s.intersection_strength, 1.0);
    }

    #[test]
    fn test_readiness_is_fixed_combination() {
        let scalars = NexusScalars {
            field_strength: 0.6,
            coherence: 0.9,
            intersection_strength: 0.4,
            coupling_weight: 0.2,
        };
        let n = SemanticNexus::new("x", vec![], scalars, &ReadinessWeights::default());
        let expected = 0.47 * 0.9 + 0.35 * 0.4 + 0.11 * 0.6 + 0.07 * 0.2;
        assert_abs_diff_eq!(n.emission_readiness(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_activation_lookup() {
        let n = SemanticNexus::from_participants(
            "sense",
            participants(&[("A", 0.6), ("B", 0.9)]),
            &matrix(),
            &ReadinessWeights::default(),
        );
        assert_eq!(n.activation_of("B"), Some(0.9));
        assert_eq!(n.activation_of("C"), None);
        assert_eq!(n.participant_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_readiness_matches_formula(
            c in 0.0f64..1.0, i in 0.0f64..1.0, f in 0.0f64..1.0, w in 0.0f64..1.0,
        ) {
            let scalars = NexusScalars {
                field_strength: f,
                coherence: c,
                intersection_strength: i,
                coupling_weight: w,
            };
            let n = SemanticNexus::new("x", vec![], scalars, &ReadinessWeights::default());
            let expected = 0.47 * c + 0.35 * i + 0.11 * f + 0.07 * w;
            prop_assert!((n.emission_readiness() - expected).abs() < 1e-12);
        }

        #[test]
        fn prop_coherence_in_unit_range(values in prop::collection::vec(0.0f64..1.0, 0..12)) {
            let c = coherence(&values);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
