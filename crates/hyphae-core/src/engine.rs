//! Turn orchestration: compose, gate and converge, then learn.
//!
//! [`HyphaeEngine`] owns the single coupling matrix of a process along with
//! the trackers. Learning happens strictly after a turn's convergence loop
//! has finished, and only when the turn completed on its own terms.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::compose::{NexusComposer, organ_coherences};
use crate::config::EngineConfig;
use crate::convergence::{ConvergenceLoop, ConvergenceTrace};
use crate::coupling::{CouplingMatrix, CouplingUpdate, HebbianLearner};
use crate::error::Result;
use crate::gate::GateFilter;
use crate::source::ActivationSource;
use crate::stats::{CycleStatsTracker, DecisionQualityTracker, GateStatsTracker};
use crate::synonym::SynonymNormalizer;

/// Why a turn did not update the coupling matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningSkip {
    Aborted,
    NoNexuses,
    LowSatisfaction,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// 1-based turn number within this engine's lifetime.
    pub turn: u64,
    pub trace: ConvergenceTrace,
    pub organ_coherences: BTreeMap<String, f64>,
    pub updates: Vec<CouplingUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<LearningSkip>,
}

impl TurnOutcome {
    pub fn learned(&self) -> bool {
        self.skipped.is_none()
    }
}

pub struct HyphaeEngine {
    config: EngineConfig,
    composer: NexusComposer,
    gate: GateFilter,
    convergence: ConvergenceLoop,
    learner: HebbianLearner,
    coupling: CouplingMatrix,
    cycle_stats: CycleStatsTracker,
    gate_stats: GateStatsTracker,
    decisions: DecisionQualityTracker,
    turns: u64,
    since_checkpoint: u32,
}

impl HyphaeEngine {
    pub fn new(
        config: EngineConfig,
        normalizer: SynonymNormalizer,
        coupling: CouplingMatrix,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            composer: NexusComposer::new(config.nexus.clone(), normalizer),
            gate: GateFilter::new(config.gate.clone()),
            convergence: ConvergenceLoop::new(config.convergence.clone()),
            learner: HebbianLearner::new(config.learning.learning_rate),
            config,
            coupling,
            cycle_stats: CycleStatsTracker::new(),
            gate_stats: GateStatsTracker::new(),
            decisions: DecisionQualityTracker::new(),
            turns: 0,
            since_checkpoint: 0,
        })
    }

    /// Resume accumulation from previously persisted trackers.
    pub fn with_trackers(
        mut self,
        cycle_stats: CycleStatsTracker,
        gate_stats: GateStatsTracker,
        decisions: DecisionQualityTracker,
    ) -> Self {
        self.cycle_stats = cycle_stats;
        self.gate_stats = gate_stats;
        self.decisions = decisions;
        self
    }

    /// Replace the convergence loop, e.g. to install a custom decay policy.
    pub fn with_convergence(mut self, convergence: ConvergenceLoop) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn process_turn(&mut self, source: &mut dyn ActivationSource) -> TurnOutcome {
        self.turns += 1;
        self.since_checkpoint = self.since_checkpoint.saturating_add(1);

        let trace = self
            .convergence
            .run(source, &self.composer, &self.gate, &self.coupling);
        let coherences = organ_coherences(&trace.nexuses);
        let satisfaction = trace.final_satisfaction();

        let skipped = if !trace.is_complete() {
            Some(LearningSkip::Aborted)
        } else if trace.nexuses.is_empty() {
            Some(LearningSkip::NoNexuses)
        } else if satisfaction < self.config.learning.min_satisfaction {
            Some(LearningSkip::LowSatisfaction)
        } else {
            None
        };

        let updates = match skipped {
            None => self.learner.update(&mut self.coupling, &coherences, satisfaction),
            Some(reason) => {
                tracing::debug!(turn = self.turns, ?reason, "coupling update skipped");
                Vec::new()
            }
        };

        self.cycle_stats.record(&trace);
        self.gate_stats.record_trace(&trace);

        tracing::debug!(
            turn = self.turns,
            state = trace.state.as_str(),
            cycles = trace.cycle_count(),
            nexuses = trace.nexuses.len(),
            updates = updates.len(),
            "turn processed"
        );

        TurnOutcome {
            turn: self.turns,
            trace,
            organ_coherences: coherences,
            updates,
            skipped,
        }
    }

    /// Record whether a decision taken at `confidence` turned out right.
    pub fn record_feedback(&mut self, confidence: f64, correct: bool, context: Option<&str>) {
        self.decisions.record(confidence, correct, context);
    }

    /// True once the configured number of turns has passed since the last
    /// checkpoint. Never true when the interval is zero.
    pub fn checkpoint_due(&self) -> bool {
        let interval = self.config.learning.checkpoint_interval;
        interval > 0 && self.since_checkpoint >= interval
    }

    pub fn mark_checkpointed(&mut self) {
        self.since_checkpoint = 0;
    }

    pub fn reset_coupling(&mut self) {
        self.coupling.reset();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coupling(&self) -> &CouplingMatrix {
        &self.coupling
    }

    pub fn into_coupling(self) -> CouplingMatrix {
        self.coupling
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn cycle_stats(&self) -> &CycleStatsTracker {
        &self.cycle_stats
    }

    pub fn gate_stats(&self) -> &GateStatsTracker {
        &self.gate_stats
    }

    pub fn decisions(&self) -> &DecisionQualityTracker {
        &self.decisions
    }
}
