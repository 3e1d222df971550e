/// Readiness weight on nexus coherence.
pub const W_COHERENCE: f64 = 0.47;

/// Readiness weight on intersection strength.
pub const W_INTERSECTION: f64 = 0.35;

/// Readiness weight on field strength.
pub const W_FIELD: f64 = 0.11;

/// Readiness weight on the coupling-weighted term.
pub const W_COUPLING: f64 = 0.07;

/// Minimum activation for an organ to join a nexus. Deliberately permissive.
pub const INTERSECTION_THRESHOLD: f64 = 0.01;

/// Coherence floor applied inline during composition and by the gate.
pub const COHERENCE_THRESHOLD: f64 = 0.4;

/// Minimum organs agreeing on a canonical atom.
pub const MIN_PARTICIPANTS: usize = 2;

/// V0 energy at the start of every convergence call.
pub const INITIAL_ENERGY: f64 = 1.0;

/// Kairos window on V0 energy: `[lo, hi)`.
pub const KAIROS_WINDOW: (f64, f64) = (0.45, 0.70);

/// Coherence required alongside the Kairos window.
pub const KAIROS_COHERENCE_FLOOR: f64 = 0.4;

/// Energy at or below which the loop stops.
pub const ENERGY_FLOOR: f64 = 0.05;

/// Default cycle budget.
pub const MAX_CYCLES: usize = 5;

/// Cycle coherence reported when no nexus survives the gate.
pub const EMPTY_CYCLE_COHERENCE: f64 = 0.5;

/// Hebbian learning rate.
pub const LEARNING_RATE: f64 = 0.05;
