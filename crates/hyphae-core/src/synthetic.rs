//! Seeded random activation maps for offline training epochs.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::organ::{ActivationMap, Organ};
use crate::source::{ActivationSource, CycleContext};

/// Atom vocabulary for synthetic turns, mixing canonical forms and synonyms.
pub const SYNTHETIC_ATOMS: &[&str] = &[
    "sense", "feel", "safety", "safe", "connection", "together", "pattern", "structure",
    "presence", "here", "truth", "honest", "overwhelm", "flooded", "more", "deeper", "grief",
    "rhythm",
];

/// Generates one random "theme" per turn: a few atoms that several organs
/// share, plus per-organ noise atoms. Successive cycles jitter the theme.
#[derive(Debug, Clone)]
pub struct SyntheticActivations {
    rng: SmallRng,
    organs: Vec<String>,
    theme: Vec<&'static str>,
    /// Chance that an organ joins a theme atom.
    pub density: f64,
    /// Activation noise applied per cycle.
    pub jitter: f64,
}

impl SyntheticActivations {
    pub fn new(seed: u64) -> Self {
        Self::with_organs(seed, Organ::roster())
    }

    pub fn with_organs(seed: u64, organs: Vec<String>) -> Self {
        let mut source = Self {
            rng: SmallRng::seed_from_u64(seed),
            organs,
            theme: Vec::new(),
            density: 0.45,
            jitter: 0.05,
        };
        source.next_turn();
        source
    }

    /// Draw a fresh theme for the next turn.
    pub fn next_turn(&mut self) {
        let size = self.rng.random_range(1..=3);
        self.theme = SYNTHETIC_ATOMS
            .choose_multiple(&mut self.rng, size)
            .copied()
            .collect();
    }

    pub fn theme(&self) -> &[&'static str] {
        &self.theme
    }
}

impl ActivationSource for SyntheticActivations {
    fn activations(&mut self, _ctx: &CycleContext<'_>) -> Result<ActivationMap> {
        let density = if self.density.is_finite() { self.density.clamp(0.0, 1.0) } else { 0.0 };
        let jitter = if self.jitter.is_finite() { self.jitter.abs() } else { 0.0 };
        let mut maps = ActivationMap::new();
        for organ in &self.organs {
            let mut atoms: HashMap<String, f64> = HashMap::new();
            for &atom in &self.theme {
                if self.rng.random_bool(density) {
                    let base = self.rng.random_range(0.4..0.95);
                    let noise = self.rng.random_range(-jitter..=jitter);
                    atoms.insert(atom.to_string(), f64::clamp(base + noise, 0.0, 1.0));
                }
            }
            if let Some(&noise_atom) = SYNTHETIC_ATOMS.choose(&mut self.rng) {
                let value = self.rng.random_range(0.0..0.3);
                atoms.entry(noise_atom.to_string()).or_insert(value);
            }
            maps.insert(organ.clone(), atoms);
        }
        Ok(maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organ::validate_activations;

    fn ctx() -> CycleContext<'static> {
        CycleContext {
            cycle: 0,
            energy: 1.0,
            previous: &[],
        }
    }

    #[test]
    fn test_same_seed_same_maps() {
        let mut a = SyntheticActivations::new(7);
        let mut b = SyntheticActivations::new(7);
        assert_eq!(a.theme(), b.theme());
        assert_eq!(a.activations(&ctx()).unwrap(), b.activations(&ctx()).unwrap());
    }

    #[test]
    fn test_maps_are_valid_and_cover_roster() {
        let mut source = SyntheticActivations::new(11);
        for _ in 0..20 {
            let maps = source.activations(&ctx()).unwrap();
            assert_eq!(maps.len(), Organ::COUNT);
            validate_activations(&maps).unwrap();
            source.next_turn();
        }
    }

    #[test]
    fn test_theme_size() {
        let mut source = SyntheticActivations::with_organs(3, vec!["A".into(), "B".into()]);
        for _ in 0..50 {
            assert!((1..=3).contains(&source.theme().len()));
            source.next_turn();
        }
    }
}
