//! Nexus-type transduction pathways.
//!
//! A stateless rules table: for the current nexus type, each rule offers a
//! successor type when its condition holds, with a probability computed from
//! the turn's continuous signals. Adding a type or transition is a table
//! edit.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NexusType {
    Urgency,
    Recursive,
    Fragmented,
    Innate,
    Relational,
    Protective,
    Disruptive,
}

impl NexusType {
    pub const ALL: [NexusType; 7] = [
        NexusType::Urgency,
        NexusType::Recursive,
        NexusType::Fragmented,
        NexusType::Innate,
        NexusType::Relational,
        NexusType::Protective,
        NexusType::Disruptive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NexusType::Urgency => "Urgency",
            NexusType::Recursive => "Recursive",
            NexusType::Fragmented => "Fragmented",
            NexusType::Innate => "Innate",
            NexusType::Relational => "Relational",
            NexusType::Protective => "Protective",
            NexusType::Disruptive => "Disruptive",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(label))
    }

    pub fn is_healing(self) -> bool {
        matches!(
            self,
            NexusType::Innate | NexusType::Relational | NexusType::Recursive
        )
    }

    pub fn is_crisis(self) -> bool {
        matches!(
            self,
            NexusType::Urgency | NexusType::Fragmented | NexusType::Disruptive
        )
    }
}

impl fmt::Display for NexusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Stay in the current state.
    Maintain,
    /// Shared rhythm settles activation into a steadier form.
    RhythmEntrainment,
    /// Mutual satisfaction between participants carries the shift.
    MutualResonance,
    /// A relational field holds what one organ alone cannot.
    RelationalHolding,
    /// Organs re-integrate around a repeated pattern.
    PatternIntegration,
    /// High energy discharges into protective or disruptive action.
    EnergyDischarge,
    /// Safety cues lower defensive activation.
    SafetyRegulation,
}

impl Mechanism {
    pub fn as_str(self) -> &'static str {
        match self {
            Mechanism::Maintain => "maintain",
            Mechanism::RhythmEntrainment => "rhythm_entrainment",
            Mechanism::MutualResonance => "mutual_resonance",
            Mechanism::RelationalHolding => "relational_holding",
            Mechanism::PatternIntegration => "pattern_integration",
            Mechanism::EnergyDischarge => "energy_discharge",
            Mechanism::SafetyRegulation => "safety_regulation",
        }
    }
}

/// Continuous inputs a transition rule may read.
#[derive(Debug, Clone, Default)]
pub struct PathwaySignals {
    pub energy: f64,
    pub satisfaction: f64,
    pub mutual_satisfaction: f64,
    pub rhythm_coherence: f64,
    pub relational_field_available: bool,
    pub organ_insights: HashMap<String, f64>,
}

impl PathwaySignals {
    fn insight(&self, key: &str) -> f64 {
        self.organ_insights.get(key).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayCandidate {
    /// Target type label. Equals the input label for `Maintain`.
    pub target: String,
    pub mechanism: Mechanism,
    pub probability: f64,
    pub description: String,
}

struct TransitionRule {
    source: NexusType,
    target: NexusType,
    mechanism: Mechanism,
    condition: fn(&PathwaySignals) -> bool,
    probability: fn(&PathwaySignals) -> f64,
    description: &'static str,
}

const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        source: NexusType::Urgency,
        target: NexusType::Protective,
        mechanism: Mechanism::EnergyDischarge,
        condition: |s| s.energy > 0.6,
        probability: |s| s.energy * (1.0 - s.satisfaction) * 0.8,
        description: "urgent activation discharges into protective holding",
    },
    TransitionRule {
        source: NexusType::Urgency,
        target: NexusType::Relational,
        mechanism: Mechanism::RelationalHolding,
        condition: |s| s.relational_field_available && s.mutual_satisfaction > 0.4,
        probability: |s| s.mutual_satisfaction * s.rhythm_coherence * 0.9,
        description: "relational field absorbs urgency",
    },
    TransitionRule {
        source: NexusType::Recursive,
        target: NexusType::Innate,
        mechanism: Mechanism::PatternIntegration,
        condition: |s| s.satisfaction > 0.6,
        probability: |s| s.satisfaction * 0.7 + s.insight("WISDOM") * 0.2,
        description: "repeated pattern integrates into innate knowing",
    },
    TransitionRule {
        source: NexusType::Recursive,
        target: NexusType::Fragmented,
        mechanism: Mechanism::EnergyDischarge,
        condition: |s| s.rhythm_coherence < 0.3,
        probability: |s| (1.0 - s.rhythm_coherence) * s.energy * 0.5,
        description: "loop loses rhythm and fragments",
    },
    TransitionRule {
        source: NexusType::Fragmented,
        target: NexusType::Relational,
        mechanism: Mechanism::RhythmEntrainment,
        condition: |s| s.rhythm_coherence > 0.5,
        probability: |s| s.mutual_satisfaction * s.rhythm_coherence * 0.9,
        description: "shared rhythm gathers fragments into relation",
    },
    TransitionRule {
        source: NexusType::Fragmented,
        target: NexusType::Protective,
        mechanism: Mechanism::SafetyRegulation,
        condition: |s| s.energy > 0.5,
        probability: |s| s.energy * 0.6 + s.insight("SANS") * 0.2,
        description: "fragmentation seeks protective containment",
    },
    TransitionRule {
        source: NexusType::Innate,
        target: NexusType::Relational,
        mechanism: Mechanism::MutualResonance,
        condition: |s| s.relational_field_available,
        probability: |s| s.mutual_satisfaction * 0.8,
        description: "innate knowing opens toward relation",
    },
    TransitionRule {
        source: NexusType::Relational,
        target: NexusType::Innate,
        mechanism: Mechanism::MutualResonance,
        condition: |s| s.mutual_satisfaction > 0.7,
        probability: |s| s.mutual_satisfaction * s.satisfaction * 0.85,
        description: "held relation settles into innate knowing",
    },
    TransitionRule {
        source: NexusType::Relational,
        target: NexusType::Recursive,
        mechanism: Mechanism::PatternIntegration,
        condition: |s| s.rhythm_coherence > 0.6,
        probability: |s| s.rhythm_coherence * 0.5,
        description: "relation deepens into recursive exploration",
    },
    TransitionRule {
        source: NexusType::Protective,
        target: NexusType::Relational,
        mechanism: Mechanism::SafetyRegulation,
        condition: |s| s.relational_field_available && s.energy < 0.6,
        probability: |s| (1.0 - s.energy) * s.mutual_satisfaction * 0.9 + s.insight("BOND") * 0.1,
        description: "safety lowers defenses toward relation",
    },
    TransitionRule {
        source: NexusType::Disruptive,
        target: NexusType::Fragmented,
        mechanism: Mechanism::EnergyDischarge,
        condition: |s| s.energy > 0.7,
        probability: |s| s.energy * 0.7,
        description: "disruption scatters into fragments",
    },
    TransitionRule {
        source: NexusType::Disruptive,
        target: NexusType::Recursive,
        mechanism: Mechanism::RhythmEntrainment,
        condition: |s| s.rhythm_coherence > 0.5,
        probability: |s| s.rhythm_coherence * s.satisfaction * 0.8,
        description: "disruption finds a rhythm and loops back",
    },
];

/// Candidate transitions from `current_type`.
///
/// An unrecognized label yields a single `Maintain` entry with probability
/// 1.0. A known type whose rules all fail their conditions yields nothing.
pub fn evaluate(current_type: &str, signals: &PathwaySignals) -> Vec<PathwayCandidate> {
    let Some(current) = NexusType::parse(current_type) else {
        return vec![PathwayCandidate {
            target: current_type.to_string(),
            mechanism: Mechanism::Maintain,
            probability: 1.0,
            description: "unrecognized nexus type; maintain current state".to_string(),
        }];
    };

    TRANSITIONS
        .iter()
        .filter(|rule| rule.source == current && (rule.condition)(signals))
        .map(|rule| PathwayCandidate {
            target: rule.target.as_str().to_string(),
            mechanism: rule.mechanism,
            probability: clamp_probability((rule.probability)(signals)),
            description: rule.description.to_string(),
        })
        .collect()
}

/// Successor types the table knows for `source`, whatever the signals.
pub fn successors(source: NexusType) -> Vec<NexusType> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.source == source)
        .map(|rule| rule.target)
        .collect()
}

/// Healing mass minus crisis mass over total mass, in [-1, 1].
pub fn healing_score(pathways: &[PathwayCandidate]) -> f64 {
    let mut healing = 0.0;
    let mut crisis = 0.0;
    let mut total = 0.0;
    for p in pathways {
        total += p.probability;
        match NexusType::parse(&p.target) {
            Some(t) if t.is_healing() => healing += p.probability,
            Some(t) if t.is_crisis() => crisis += p.probability,
            _ => {}
        }
    }
    if total <= 0.0 {
        return 0.0;
    }
    ((healing - crisis) / total).clamp(-1.0, 1.0)
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}
