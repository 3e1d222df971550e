//! Four-stage admission gate over composed nexuses.
//!
//! Every stage is an independent predicate, so the surviving set does not
//! depend on stage order and filtering is idempotent. An empty result is a
//! valid outcome: nothing is ready to emit this turn.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::constants::MIN_PARTICIPANTS;
use crate::nexus::SemanticNexus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    Participants,
    Coherence,
    SatisfactionWindow,
    Readiness,
}

impl GateStage {
    pub const ALL: [GateStage; 4] = [
        GateStage::Participants,
        GateStage::Coherence,
        GateStage::SatisfactionWindow,
        GateStage::Readiness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GateStage::Participants => "participants",
            GateStage::Coherence => "coherence",
            GateStage::SatisfactionWindow => "satisfaction_window",
            GateStage::Readiness => "readiness",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == s)
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage counts from one filtering pass. A nexus counts as evaluated at
/// a stage only if it survived every earlier stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateReport {
    pub evaluated: BTreeMap<GateStage, usize>,
    pub passed: BTreeMap<GateStage, usize>,
}

impl GateReport {
    pub fn rejected_at(&self, stage: GateStage) -> usize {
        self.evaluated.get(&stage).copied().unwrap_or(0)
            - self.passed.get(&stage).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct GateFilter {
    config: GateConfig,
}

impl GateFilter {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether a nexus clears `stage`.
    pub fn admits(&self, stage: GateStage, nexus: &SemanticNexus) -> bool {
        match stage {
            GateStage::Participants => nexus.participant_count() >= MIN_PARTICIPANTS,
            GateStage::Coherence => nexus.coherence() >= self.config.coherence_threshold,
            GateStage::SatisfactionWindow => {
                let (lo, hi) = self.config.satisfaction_window;
                (lo..=hi).contains(&nexus.field_strength())
            }
            GateStage::Readiness => {
                nexus.emission_readiness() >= self.config.min_emission_readiness
            }
        }
    }

    /// Order-preserving filter.
    pub fn filter(&self, nexuses: &[SemanticNexus]) -> Vec<SemanticNexus> {
        self.filter_with_report(nexuses).0
    }

    pub fn filter_with_report(&self, nexuses: &[SemanticNexus]) -> (Vec<SemanticNexus>, GateReport) {
        let mut report = GateReport::default();
        let mut kept = Vec::new();

        'nexus: for nexus in nexuses {
            for stage in GateStage::ALL {
                *report.evaluated.entry(stage).or_default() += 1;
                if !self.admits(stage, nexus) {
                    continue 'nexus;
                }
                *report.passed.entry(stage).or_default() += 1;
            }
            kept.push(nexus.clone());
        }

        (kept, report)
    }
}

/// Free-standing form of the gate with explicit thresholds.
pub fn filter(
    nexuses: &[SemanticNexus],
    coherence_threshold: f64,
    satisfaction_window: (f64, f64),
    min_emission_readiness: f64,
) -> Vec<SemanticNexus> {
    GateFilter::new(GateConfig {
        coherence_threshold,
        satisfaction_window,
        min_emission_readiness,
    })
    .filter(nexuses)
}
