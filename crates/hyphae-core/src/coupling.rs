//! Organ coupling matrix and its Hebbian learner.
//!
//! The matrix is square over an ordered organ roster, symmetric by
//! construction, and every entry stays in [0, 1]. All writes go through
//! [`CouplingMatrix::set`], which mirrors and clamps.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::constants::LEARNING_RATE;
use crate::error::{EngineError, Result};
use crate::organ::Organ;

#[derive(Debug, Clone, PartialEq)]
pub struct CouplingMatrix {
    organs: Vec<String>,
    index: HashMap<String, usize>,
    values: Vec<Vec<f64>>,
    total_updates: u64,
}

impl CouplingMatrix {
    /// Identity matrix over the given roster.
    pub fn identity(organs: Vec<String>) -> Result<Self> {
        let index = build_index(&organs)?;
        let values = identity_values(organs.len());
        Ok(Self {
            organs,
            index,
            values,
            total_updates: 0,
        })
    }

    /// Identity matrix over the default 11-organ roster.
    pub fn default_roster() -> Self {
        let organs = Organ::roster();
        let index = organs
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let values = identity_values(organs.len());
        Self {
            organs,
            index,
            values,
            total_updates: 0,
        }
    }

    /// Build from explicit values. The input is symmetrized (upper triangle
    /// wins) and clamped so the invariants hold regardless of the source.
    pub fn from_values(organs: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        let mut matrix = Self::identity(organs)?;
        let k = matrix.size();
        if values.len() != k {
            return Err(EngineError::ShapeMismatch {
                expected: k,
                found: values.len(),
            });
        }
        if let Some(row) = values.iter().find(|row| row.len() != k) {
            return Err(EngineError::ShapeMismatch {
                expected: k,
                found: row.len(),
            });
        }
        for i in 0..k {
            for j in i..k {
                matrix.set(i, j, values[i][j]);
            }
        }
        Ok(matrix)
    }

    /// Embed a smaller legacy matrix into the upper-left block of an
    /// identity matrix over `organs`. The remainder stays identity.
    pub fn embed_legacy(organs: Vec<String>, legacy: &[Vec<f64>]) -> Result<Self> {
        let mut matrix = Self::identity(organs)?;
        let k = matrix.size();
        let n = legacy.len();
        if n > k {
            return Err(EngineError::ShapeMismatch {
                expected: k,
                found: n,
            });
        }
        if let Some(row) = legacy.iter().find(|row| row.len() != n) {
            return Err(EngineError::ShapeMismatch {
                expected: n,
                found: row.len(),
            });
        }
        for i in 0..n {
            for j in i..n {
                matrix.set(i, j, legacy[i][j]);
            }
        }
        Ok(matrix)
    }

    pub fn size(&self) -> usize {
        self.organs.len()
    }

    pub fn organs(&self) -> &[String] {
        &self.organs
    }

    pub fn index_of(&self, organ: &str) -> Option<usize> {
        self.index.get(organ).copied()
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    pub fn set_total_updates(&mut self, total: u64) {
        self.total_updates = total;
    }

    /// Coupling between two organs by name. Unknown names read as 0.0.
    pub fn get(&self, a: &str, b: &str) -> f64 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.values[i][j],
            _ => 0.0,
        }
    }

    /// Coupling by roster position. `None` when either index is out of range.
    pub fn at(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i)?.get(j).copied()
    }

    /// Write one entry and its mirror, clamped to [0, 1]. NaN writes 0.0.
    /// Returns false, leaving the matrix untouched, when an index is out of
    /// range.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> bool {
        let k = self.size();
        if i >= k || j >= k {
            return false;
        }
        let v = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        self.values[i][j] = v;
        self.values[j][i] = v;
        true
    }

    /// Copy values for organs present in both rosters, by name.
    pub fn merge_by_name(&mut self, other: &CouplingMatrix) {
        for (i, a) in self.organs.clone().iter().enumerate() {
            let Some(oi) = other.index_of(a) else {
                continue;
            };
            for j in i..self.size() {
                if let Some(oj) = other.index_of(&self.organs[j]) {
                    self.set(i, j, other.values[oi][oj]);
                }
            }
        }
    }

    /// Reset to identity, keeping the roster. Update count restarts.
    pub fn reset(&mut self) {
        self.values = identity_values(self.size());
        self.total_updates = 0;
    }

    pub fn is_symmetric(&self) -> bool {
        let k = self.size();
        (0..k).all(|i| (0..k).all(|j| self.values[i][j] == self.values[j][i]))
    }

    pub fn is_identity(&self) -> bool {
        let k = self.size();
        (0..k).all(|i| {
            (0..k).all(|j| self.values[i][j] == if i == j { 1.0 } else { 0.0 })
        })
    }

    /// Off-diagonal pairs sorted by coupling strength, strongest first.
    pub fn strongest_pairs(&self, limit: usize) -> Vec<(String, String, f64)> {
        let k = self.size();
        let mut pairs: Vec<(String, String, f64)> = (0..k)
            .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
            .map(|(i, j)| {
                (
                    self.organs[i].clone(),
                    self.organs[j].clone(),
                    self.values[i][j],
                )
            })
            .collect();
        pairs.sort_by(|a, b| b.2.total_cmp(&a.2));
        pairs.truncate(limit);
        pairs
    }
}

impl Default for CouplingMatrix {
    fn default() -> Self {
        Self::default_roster()
    }
}

fn identity_values(k: usize) -> Vec<Vec<f64>> {
    (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

fn build_index(organs: &[String]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(organs.len());
    for (i, name) in organs.iter().enumerate() {
        if index.insert(name.clone(), i).is_some() {
            return Err(EngineError::DuplicateOrgan(name.clone()));
        }
    }
    Ok(index)
}

/// One applied Hebbian step, for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingUpdate {
    pub organ_a: String,
    pub organ_b: String,
    pub previous: f64,
    pub delta: f64,
    pub value: f64,
}

/// Multiplicative Hebbian rule with a saturating `(1 - current)` factor.
#[derive(Debug, Clone, Copy)]
pub struct HebbianLearner {
    pub learning_rate: f64,
}

impl Default for HebbianLearner {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
        }
    }
}

impl HebbianLearner {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    /// Apply one update over every unordered pair of organs present in
    /// `organ_coherences`. Organs missing from the map, or unknown to the
    /// matrix, are left untouched.
    pub fn update(
        &self,
        matrix: &mut CouplingMatrix,
        organ_coherences: &BTreeMap<String, f64>,
        satisfaction: f64,
    ) -> Vec<CouplingUpdate> {
        let satisfaction = unit_or_zero(satisfaction);
        let participants: Vec<(usize, &str, f64)> = organ_coherences
            .iter()
            .filter_map(|(name, c)| match matrix.index_of(name) {
                Some(i) => Some((i, name.as_str(), unit_or_zero(*c))),
                None => {
                    tracing::debug!("skipping coupling update for unknown organ '{name}'");
                    None
                }
            })
            .collect();

        let mut updates = Vec::new();
        for (a, &(i, name_i, c_i)) in participants.iter().enumerate() {
            for &(j, name_j, c_j) in &participants[a + 1..] {
                let current = matrix.values[i][j];
                let co_activation = c_i * c_j * satisfaction;
                let delta = self.learning_rate * co_activation * (1.0 - current);
                matrix.set(i, j, current + delta);
                updates.push(CouplingUpdate {
                    organ_a: name_i.to_string(),
                    organ_b: name_j.to_string(),
                    previous: current,
                    delta,
                    value: matrix.values[i][j],
                });
            }
        }

        if !updates.is_empty() {
            matrix.total_updates += 1;
        }
        updates
    }
}

fn unit_or_zero(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
