//! Multi-cycle V0 convergence.
//!
//! Each cycle composes and gates a fresh activation map, reads the cycle's
//! coherence and satisfaction, and lowers the V0 energy through an
//! [`EnergyDecayPolicy`]. The loop watches for the Kairos condition (energy
//! inside the target window with enough coherence) and always stops within
//! the configured cycle budget.

use serde::{Deserialize, Serialize};

use crate::compose::NexusComposer;
use crate::config::{ConvergenceConfig, DecayConfig};
use crate::constants::EMPTY_CYCLE_COHERENCE;
use crate::coupling::CouplingMatrix;
use crate::gate::{GateFilter, GateReport};
use crate::nexus::{SemanticNexus, mean};
use crate::organ::validate_activations;
use crate::source::{ActivationSource, CycleContext};

/// Readings a decay policy may base its step on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSignals {
    pub cycle: usize,
    pub energy: f64,
    pub coherence: f64,
    pub satisfaction: f64,
    pub admitted: usize,
}

/// How much energy one cycle removes. The loop clamps the returned step to
/// `[0, energy]`, so policies need not guard the bounds themselves.
pub trait EnergyDecayPolicy: Send + Sync {
    fn decay(&self, signals: &CycleSignals) -> f64;

    fn name(&self) -> &'static str;
}

/// Constant step regardless of signals.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepDecay {
    pub step: f64,
}

impl EnergyDecayPolicy for FixedStepDecay {
    fn decay(&self, _signals: &CycleSignals) -> f64 {
        self.step
    }

    fn name(&self) -> &'static str {
        "fixed_step"
    }
}

/// Step proportional to the mean of coherence and satisfaction.
#[derive(Debug, Clone, Copy)]
pub struct CoherenceProportionalDecay {
    pub rate: f64,
}

impl EnergyDecayPolicy for CoherenceProportionalDecay {
    fn decay(&self, signals: &CycleSignals) -> f64 {
        self.rate * 0.5 * (signals.coherence + signals.satisfaction)
    }

    fn name(&self) -> &'static str {
        "coherence_proportional"
    }
}

/// Removes a coherence-scaled fraction of the remaining energy.
#[derive(Debug, Clone, Copy)]
pub struct GeometricDecay {
    pub factor: f64,
}

impl EnergyDecayPolicy for GeometricDecay {
    fn decay(&self, signals: &CycleSignals) -> f64 {
        signals.energy * self.factor * signals.coherence
    }

    fn name(&self) -> &'static str {
        "geometric"
    }
}

pub fn decay_policy(config: &DecayConfig) -> Box<dyn EnergyDecayPolicy> {
    match *config {
        DecayConfig::FixedStep { step } => Box::new(FixedStepDecay { step }),
        DecayConfig::CoherenceProportional { rate } => Box::new(CoherenceProportionalDecay { rate }),
        DecayConfig::Geometric { factor } => Box::new(GeometricDecay { factor }),
    }
}

/// Maps a cycle's coherence and the energy descended so far to [0, 1].
pub trait SatisfactionPolicy: Send + Sync {
    fn satisfaction(&self, coherence: f64, energy: f64, initial_energy: f64) -> f64;
}

/// `w * coherence + (1 - w) * (initial - energy)`, clamped.
#[derive(Debug, Clone, Copy)]
pub struct CoherenceDescentSatisfaction {
    pub coherence_weight: f64,
}

impl SatisfactionPolicy for CoherenceDescentSatisfaction {
    fn satisfaction(&self, coherence: f64, energy: f64, initial_energy: f64) -> f64 {
        let w = self.coherence_weight.clamp(0.0, 1.0);
        let descent = (initial_energy - energy).max(0.0);
        let s = w * coherence + (1.0 - w) * descent;
        if s.is_finite() { s.clamp(0.0, 1.0) } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceState {
    Running,
    /// Kairos reached and the loop was told to stop there.
    ConvergedTarget,
    /// Cycle budget exhausted.
    ConvergedBudget,
    /// Energy fell to the floor.
    ConvergedFloor,
    /// A cycle failed to lower energy by the minimum descent.
    Stalled,
    /// The activation source failed; the trace holds a partial result.
    Aborted,
}

impl ConvergenceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvergenceState::Running => "running",
            ConvergenceState::ConvergedTarget => "converged_target",
            ConvergenceState::ConvergedBudget => "converged_budget",
            ConvergenceState::ConvergedFloor => "converged_floor",
            ConvergenceState::Stalled => "stalled",
            ConvergenceState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ConvergenceState::Running
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub energy_before: f64,
    pub energy_after: f64,
    pub coherence: f64,
    pub satisfaction: f64,
    pub composed: usize,
    pub admitted: usize,
    pub kairos: bool,
    #[serde(skip)]
    pub gate: GateReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceTrace {
    pub state: ConvergenceState,
    pub cycles: Vec<CycleRecord>,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub target_reached: bool,
    /// First cycle at which Kairos held. Never overwritten once set.
    pub target_cycle_index: Option<usize>,
    /// Gated nexuses of the last completed cycle.
    pub nexuses: Vec<SemanticNexus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ConvergenceTrace {
    fn new(initial_energy: f64) -> Self {
        Self {
            state: ConvergenceState::Running,
            cycles: Vec::new(),
            initial_energy,
            final_energy: initial_energy,
            target_reached: false,
            target_cycle_index: None,
            nexuses: Vec::new(),
            failure: None,
        }
    }

    /// True when the loop ended by one of its own stopping rules.
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal() && self.state != ConvergenceState::Aborted
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    pub fn final_coherence(&self) -> f64 {
        self.cycles
            .last()
            .map(|c| c.coherence)
            .unwrap_or(EMPTY_CYCLE_COHERENCE)
    }

    pub fn final_satisfaction(&self) -> f64 {
        self.cycles.last().map(|c| c.satisfaction).unwrap_or(0.0)
    }

    pub fn best(&self) -> Option<&SemanticNexus> {
        self.nexuses.first()
    }
}

pub struct ConvergenceLoop {
    config: ConvergenceConfig,
    decay: Box<dyn EnergyDecayPolicy>,
    satisfaction: Box<dyn SatisfactionPolicy>,
}

impl ConvergenceLoop {
    pub fn new(config: ConvergenceConfig) -> Self {
        let decay = decay_policy(&config.decay);
        let satisfaction = Box::new(CoherenceDescentSatisfaction {
            coherence_weight: config.satisfaction_coherence_weight,
        });
        Self {
            config,
            decay,
            satisfaction,
        }
    }

    pub fn with_decay(mut self, decay: Box<dyn EnergyDecayPolicy>) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_satisfaction(mut self, satisfaction: Box<dyn SatisfactionPolicy>) -> Self {
        self.satisfaction = satisfaction;
        self
    }

    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }

    pub fn decay_name(&self) -> &'static str {
        self.decay.name()
    }

    pub fn run(
        &self,
        source: &mut dyn ActivationSource,
        composer: &NexusComposer,
        gate: &GateFilter,
        coupling: &CouplingMatrix,
    ) -> ConvergenceTrace {
        let max_cycles = self.config.effective_max_cycles();
        let initial = clamp_unit(self.config.initial_energy);
        let (kairos_lo, kairos_hi) = self.config.kairos_window;

        let mut trace = ConvergenceTrace::new(initial);
        let mut energy = initial;
        let mut cycle = 0usize;

        loop {
            let ctx = CycleContext {
                cycle,
                energy,
                previous: &trace.nexuses,
            };
            let maps = match source
                .activations(&ctx)
                .and_then(|m| validate_activations(&m).map(|()| m))
            {
                Ok(maps) => maps,
                Err(e) => {
                    tracing::warn!(cycle, "convergence aborted: {e}");
                    trace.state = ConvergenceState::Aborted;
                    trace.failure = Some(e.to_string());
                    trace.final_energy = energy;
                    return trace;
                }
            };

            let composed = composer.compose(&maps, coupling);
            let (admitted, gate_report) = gate.filter_with_report(&composed);

            let coherence = if admitted.is_empty() {
                EMPTY_CYCLE_COHERENCE
            } else {
                let values: Vec<f64> = admitted.iter().map(|n| n.coherence()).collect();
                mean(&values)
            };
            let satisfaction = self.satisfaction.satisfaction(coherence, energy, initial);

            let signals = CycleSignals {
                cycle,
                energy,
                coherence,
                satisfaction,
                admitted: admitted.len(),
            };
            let raw = self.decay.decay(&signals);
            let step = if raw.is_finite() { raw.clamp(0.0, energy) } else { 0.0 };
            let energy_before = energy;
            energy = clamp_unit(energy - step);

            let kairos = energy >= kairos_lo
                && energy < kairos_hi
                && coherence >= self.config.kairos_coherence_floor;
            if kairos && !trace.target_reached {
                trace.target_reached = true;
                trace.target_cycle_index = Some(cycle);
                tracing::debug!(cycle, energy, coherence, "kairos reached");
            }

            trace.cycles.push(CycleRecord {
                cycle,
                energy_before,
                energy_after: energy,
                coherence,
                satisfaction,
                composed: composed.len(),
                admitted: admitted.len(),
                kairos,
                gate: gate_report,
            });
            trace.nexuses = admitted;
            trace.final_energy = energy;

            let state = if cycle + 1 >= max_cycles {
                ConvergenceState::ConvergedBudget
            } else if energy <= self.config.energy_floor {
                ConvergenceState::ConvergedFloor
            } else if trace.target_reached && self.config.stop_on_target {
                ConvergenceState::ConvergedTarget
            } else if step < self.config.min_descent {
                ConvergenceState::Stalled
            } else {
                ConvergenceState::Running
            };

            if state.is_terminal() {
                trace.state = state;
                return trace;
            }
            cycle += 1;
        }
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
