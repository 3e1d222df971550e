//! Engine configuration: every weight and threshold in one versioned struct.
//!
//! Each section defaults independently, so a partial TOML document only
//! overrides what it names.

use serde::{Deserialize, Serialize};

use crate::constants::{
    COHERENCE_THRESHOLD, ENERGY_FLOOR, INITIAL_ENERGY, INTERSECTION_THRESHOLD,
    KAIROS_COHERENCE_FLOOR, KAIROS_WINDOW, LEARNING_RATE, MAX_CYCLES, W_COHERENCE, W_COUPLING,
    W_FIELD, W_INTERSECTION,
};
use crate::error::{EngineError, Result};

pub const CONFIG_VERSION: u32 = 1;

/// Linear weights of the emission-readiness composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessWeights {
    pub coherence: f64,
    pub intersection: f64,
    pub field: f64,
    pub coupling: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            coherence: W_COHERENCE,
            intersection: W_INTERSECTION,
            field: W_FIELD,
            coupling: W_COUPLING,
        }
    }
}

impl ReadinessWeights {
    pub fn score(&self, coherence: f64, intersection: f64, field: f64, coupling: f64) -> f64 {
        self.coherence * coherence
            + self.intersection * intersection
            + self.field * field
            + self.coupling * coupling
    }

    pub fn total(&self) -> f64 {
        self.coherence + self.intersection + self.field + self.coupling
    }
}

/// How one organ's raw atoms that collapse onto the same canonical atom
/// are combined into a single participant activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    #[default]
    Max,
    Mean,
    SumClamped,
}

impl MergePolicy {
    pub fn merge(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            MergePolicy::Max => values.iter().copied().fold(f64::MIN, f64::max),
            MergePolicy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            MergePolicy::SumClamped => values.iter().sum::<f64>().clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    pub intersection_threshold: f64,
    pub coherence_threshold: f64,
    pub merge_policy: MergePolicy,
    pub weights: ReadinessWeights,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            intersection_threshold: INTERSECTION_THRESHOLD,
            coherence_threshold: COHERENCE_THRESHOLD,
            merge_policy: MergePolicy::Max,
            weights: ReadinessWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub coherence_threshold: f64,
    /// Closed interval on field strength.
    pub satisfaction_window: (f64, f64),
    pub min_emission_readiness: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            coherence_threshold: COHERENCE_THRESHOLD,
            satisfaction_window: (0.0, 1.0),
            min_emission_readiness: 0.0,
        }
    }
}

/// Which energy-decay policy the convergence loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayConfig {
    FixedStep { step: f64 },
    CoherenceProportional { rate: f64 },
    Geometric { factor: f64 },
}

impl Default for DecayConfig {
    fn default() -> Self {
        DecayConfig::CoherenceProportional { rate: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// When false, a turn runs exactly one composition cycle.
    pub multi_cycle: bool,
    pub max_cycles: usize,
    pub initial_energy: f64,
    /// Half-open `[lo, hi)` interval on energy.
    pub kairos_window: (f64, f64),
    pub kairos_coherence_floor: f64,
    pub energy_floor: f64,
    pub stop_on_target: bool,
    /// A cycle that lowers energy by less than this stalls the loop.
    pub min_descent: f64,
    pub decay: DecayConfig,
    /// Weight of coherence (vs. energy descent) in cycle satisfaction.
    pub satisfaction_coherence_weight: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            multi_cycle: true,
            max_cycles: MAX_CYCLES,
            initial_energy: INITIAL_ENERGY,
            kairos_window: KAIROS_WINDOW,
            kairos_coherence_floor: KAIROS_COHERENCE_FLOOR,
            energy_floor: ENERGY_FLOOR,
            stop_on_target: true,
            min_descent: 1e-6,
            decay: DecayConfig::default(),
            satisfaction_coherence_weight: 0.7,
        }
    }
}

impl ConvergenceConfig {
    /// Cycle budget actually enforced, after the multi-cycle toggle.
    pub fn effective_max_cycles(&self) -> usize {
        if self.multi_cycle {
            self.max_cycles.max(1)
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub learning_rate: f64,
    /// Turns between persistence checkpoints. Zero disables periodic saves.
    pub checkpoint_interval: u32,
    /// Turns whose final satisfaction falls below this are not learned from.
    pub min_satisfaction: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            checkpoint_interval: 10,
            min_satisfaction: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: u32,
    pub nexus: NexusConfig,
    pub gate: GateConfig,
    pub convergence: ConvergenceConfig,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            nexus: NexusConfig::default(),
            gate: GateConfig::default(),
            convergence: ConvergenceConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        unit("nexus.intersection_threshold", self.nexus.intersection_threshold)?;
        unit("nexus.coherence_threshold", self.nexus.coherence_threshold)?;
        let w = self.nexus.weights;
        for (name, value) in [
            ("coherence", w.coherence),
            ("intersection", w.intersection),
            ("field", w.field),
            ("coupling", w.coupling),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "nexus.weights.{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        unit("gate.coherence_threshold", self.gate.coherence_threshold)?;
        window("gate.satisfaction_window", self.gate.satisfaction_window)?;
        unit("gate.min_emission_readiness", self.gate.min_emission_readiness)?;

        let c = &self.convergence;
        if c.max_cycles == 0 {
            return Err(EngineError::InvalidConfig(
                "convergence.max_cycles must be at least 1".to_string(),
            ));
        }
        unit("convergence.initial_energy", c.initial_energy)?;
        window("convergence.kairos_window", c.kairos_window)?;
        unit("convergence.kairos_coherence_floor", c.kairos_coherence_floor)?;
        unit("convergence.energy_floor", c.energy_floor)?;
        unit("convergence.satisfaction_coherence_weight", c.satisfaction_coherence_weight)?;
        if !c.min_descent.is_finite() || c.min_descent < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "convergence.min_descent must be non-negative, got {}",
                c.min_descent
            )));
        }
        let decay_param = match c.decay {
            DecayConfig::FixedStep { step } => step,
            DecayConfig::CoherenceProportional { rate } => rate,
            DecayConfig::Geometric { factor } => factor,
        };
        unit("convergence.decay", decay_param)?;

        unit("learning.learning_rate", self.learning.learning_rate)?;
        unit("learning.min_satisfaction", self.learning.min_satisfaction)?;
        Ok(())
    }
}

fn unit(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn window(name: &str, (lo, hi): (f64, f64)) -> Result<()> {
    unit(name, lo)?;
    unit(name, hi)?;
    if lo > hi {
        return Err(EngineError::InvalidConfig(format!(
            "{name} is inverted: [{lo}, {hi}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert_abs_diff_eq!(ReadinessWeights::default().total(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut config = EngineConfig::default();
        config.convergence.kairos_window = (0.8, 0.2);
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_cycles_rejected() {
        let mut config = EngineConfig::default();
        config.convergence.max_cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_cycle_mode() {
        let mut c = ConvergenceConfig::default();
        assert_eq!(c.effective_max_cycles(), 5);
        c.multi_cycle = false;
        assert_eq!(c.effective_max_cycles(), 1);
    }

    #[test]
    fn test_merge_policies() {
        let values = [0.8, 0.9];
        assert_abs_diff_eq!(MergePolicy::Max.merge(&values), 0.9);
        assert_abs_diff_eq!(MergePolicy::Mean.merge(&values), 0.85);
        assert_abs_diff_eq!(MergePolicy::SumClamped.merge(&values), 1.0);
        assert_eq!(MergePolicy::Max.merge(&[]), 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"gate": {"min_emission_readiness": 0.5}}"#).unwrap();
        assert_eq!(config.gate.min_emission_readiness, 0.5);
        assert_eq!(config.gate.coherence_threshold, COHERENCE_THRESHOLD);
        assert_eq!(config.convergence.max_cycles, MAX_CYCLES);
    }
}
