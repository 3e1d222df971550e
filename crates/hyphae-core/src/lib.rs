//! DAE_HYPHAE nexus formation and convergence engine.
//!
//! Independent organs score an input as activations over semantic atoms.
//! Where two or more organs agree on the same canonical atom, a nexus forms;
//! nexuses are gated, iterated through a bounded V0-energy convergence loop
//! toward a Kairos window, and the organs that co-activated on a satisfying
//! turn strengthen their pairwise coupling by a saturating Hebbian rule.
//!
//! Zero I/O. Persistence lives in `hyphae-store`.

pub mod compose;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod coupling;
pub mod engine;
pub mod error;
pub mod gate;
pub mod lexicon;
pub mod nexus;
pub mod organ;
pub mod pathway;
pub mod source;
pub mod stats;
pub mod synonym;
pub mod synthetic;
pub mod time;
pub mod wire;

pub use compose::{NexusComposer, organ_coherences, rank};
pub use config::{
    CONFIG_VERSION, ConvergenceConfig, DecayConfig, EngineConfig, GateConfig, LearningConfig,
    MergePolicy, NexusConfig, ReadinessWeights,
};
pub use convergence::{
    CoherenceDescentSatisfaction, CoherenceProportionalDecay, ConvergenceLoop, ConvergenceState,
    ConvergenceTrace, CycleRecord, CycleSignals, EnergyDecayPolicy, FixedStepDecay,
    GeometricDecay, SatisfactionPolicy, decay_policy,
};
pub use coupling::{CouplingMatrix, CouplingUpdate, HebbianLearner};
pub use engine::{HyphaeEngine, LearningSkip, TurnOutcome};
pub use error::{EngineError, Result};
pub use gate::{GateFilter, GateReport, GateStage};
pub use lexicon::{LexicalActivationSource, Lexicon, default_lexicon, tokenize};
pub use nexus::{NexusScalars, Participant, SemanticNexus};
pub use organ::{ActivationMap, Organ, OrganResult, OrganResults, validate_activations};
pub use pathway::{Mechanism, NexusType, PathwayCandidate, PathwaySignals, healing_score};
pub use source::{ActivationSource, CycleContext, StaticActivations};
pub use stats::{
    CycleStatsSnapshot, CycleStatsTracker, DecisionQualitySnapshot, DecisionQualityTracker,
    GateStatsSnapshot, GateStatsTracker, RunningStat,
};
pub use synonym::{SynonymConfig, SynonymGroup, SynonymNormalizer, default_groups};
pub use synthetic::SyntheticActivations;
pub use wire::{CouplingDocument, CouplingMetadata};
