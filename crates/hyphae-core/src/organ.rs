//! Organ roster and per-organ results.
//!
//! Organs are the independent scorers whose activations over semantic atoms
//! feed nexus composition. The coupling matrix is indexed by organ *name*,
//! so the closed [`Organ`] roster is the default, not a hard requirement.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Activations for one input: organ name → (atom → strength in [0, 1]).
pub type ActivationMap = BTreeMap<String, HashMap<String, f64>>;

/// The default closed set of organs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Organ {
    Listening,
    Empathy,
    Wisdom,
    Authenticity,
    Presence,
    Bond,
    Sans,
    Ndam,
    Rnx,
    Eo,
    Card,
}

impl Organ {
    pub const ALL: [Organ; 11] = [
        Organ::Listening,
        Organ::Empathy,
        Organ::Wisdom,
        Organ::Authenticity,
        Organ::Presence,
        Organ::Bond,
        Organ::Sans,
        Organ::Ndam,
        Organ::Rnx,
        Organ::Eo,
        Organ::Card,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            Organ::Listening => "LISTENING",
            Organ::Empathy => "EMPATHY",
            Organ::Wisdom => "WISDOM",
            Organ::Authenticity => "AUTHENTICITY",
            Organ::Presence => "PRESENCE",
            Organ::Bond => "BOND",
            Organ::Sans => "SANS",
            Organ::Ndam => "NDAM",
            Organ::Rnx => "RNX",
            Organ::Eo => "EO",
            Organ::Card => "CARD",
        }
    }

    /// Case-insensitive parse. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|o| o.as_str() == upper)
    }

    /// Position in the default roster (and therefore in a default matrix).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Default roster as owned names, in matrix order.
    pub fn roster() -> Vec<String> {
        Self::ALL.iter().map(|o| o.as_str().to_string()).collect()
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one organ for one input.
///
/// The optional fields are only produced by the trauma-informed organs;
/// everyone else leaves them `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganResult {
    pub coherence: f64,
    #[serde(default)]
    pub activations: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyvagal_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_distance: Option<f64>,
}

impl OrganResult {
    pub fn new(coherence: f64, activations: HashMap<String, f64>) -> Self {
        Self {
            coherence,
            activations,
            ..Self::default()
        }
    }
}

/// A full bank of organ results for one input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganResults(pub BTreeMap<String, OrganResult>);

impl OrganResults {
    pub fn insert(&mut self, organ: impl Into<String>, result: OrganResult) {
        self.0.insert(organ.into(), result);
    }

    /// Per-organ self-reported coherence.
    pub fn coherences(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(name, r)| (name.clone(), r.coherence))
            .collect()
    }

    pub fn into_activation_map(self) -> ActivationMap {
        self.0
            .into_iter()
            .map(|(name, r)| (name, r.activations))
            .collect()
    }
}

/// Check that every activation is a finite value in [0, 1].
pub fn validate_activations(map: &ActivationMap) -> crate::error::Result<()> {
    for (organ, atoms) in map {
        for (atom, value) in atoms {
            if !value.is_finite() || !(0.0..=1.0).contains(value) {
                return Err(crate::error::EngineError::Activation(format!(
                    "{organ}/{atom} has activation {value} outside [0, 1]"
                )));
            }
        }
    }
    Ok(())
}
