//! Running statistics over turns: per-cycle convergence, gate pass rates,
//! and decision quality by confidence bucket.
//!
//! Each tracker round-trips through a snapshot document. Derived rates are
//! written for readers but recomputed from counts on load, so a hand-edited
//! rate can never disagree with the counts behind it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::convergence::{ConvergenceState, ConvergenceTrace};
use crate::gate::{GateReport, GateStage};
use crate::time::iso8601_now;

/// Smoothing factor for exponential moving averages.
pub const EMA_ALPHA: f64 = 0.1;

/// Welford mean/variance plus an exponential moving average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStat {
    pub count: u64,
    pub mean: f64,
    /// Sum of squared deviations from the mean.
    pub m2: f64,
    pub ema: f64,
}

impl RunningStat {
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.ema = if self.count == 1 {
            value
        } else {
            EMA_ALPHA * value + (1.0 - EMA_ALPHA) * self.ema
        };
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// --- cycle statistics ---

#[derive(Debug, Clone, Default, PartialEq)]
struct CycleBucket {
    observations: u64,
    kairos_hits: u64,
    energy: RunningStat,
    coherence: RunningStat,
    satisfaction: RunningStat,
}

#[derive(Debug, Clone, Default)]
pub struct CycleStatsTracker {
    turns: u64,
    target_turns: u64,
    states: BTreeMap<String, u64>,
    cycles_per_turn: RunningStat,
    buckets: BTreeMap<usize, CycleBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleBucketSnapshot {
    pub observations: u64,
    pub kairos_hits: u64,
    #[serde(default)]
    pub kairos_probability: f64,
    #[serde(default)]
    pub energy: RunningStat,
    #[serde(default)]
    pub coherence: RunningStat,
    #[serde(default)]
    pub satisfaction: RunningStat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatsSnapshot {
    pub timestamp: String,
    pub total_turns: u64,
    #[serde(default)]
    pub target_turns: u64,
    #[serde(default)]
    pub target_rate: f64,
    #[serde(default)]
    pub cycles_per_turn: RunningStat,
    #[serde(default)]
    pub terminal_states: BTreeMap<String, u64>,
    #[serde(default)]
    pub cycles: BTreeMap<String, CycleBucketSnapshot>,
}

impl CycleStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trace: &ConvergenceTrace) {
        self.turns += 1;
        if trace.target_reached {
            self.target_turns += 1;
        }
        *self.states.entry(trace.state.as_str().to_string()).or_default() += 1;
        self.cycles_per_turn.push(trace.cycle_count() as f64);

        for record in &trace.cycles {
            let bucket = self.buckets.entry(record.cycle).or_default();
            bucket.observations += 1;
            if record.kairos {
                bucket.kairos_hits += 1;
            }
            bucket.energy.push(record.energy_after);
            bucket.coherence.push(record.coherence);
            bucket.satisfaction.push(record.satisfaction);
        }
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn target_rate(&self) -> f64 {
        rate(self.target_turns, self.turns)
    }

    pub fn state_count(&self, state: ConvergenceState) -> u64 {
        self.states.get(state.as_str()).copied().unwrap_or(0)
    }

    /// Fraction of turns reaching cycle `cycle` whose energy was inside the
    /// Kairos window there.
    pub fn kairos_probability(&self, cycle: usize) -> f64 {
        self.buckets
            .get(&cycle)
            .map(|b| rate(b.kairos_hits, b.observations))
            .unwrap_or(0.0)
    }

    pub fn mean_energy_at(&self, cycle: usize) -> Option<f64> {
        self.buckets.get(&cycle).map(|b| b.energy.mean)
    }

    pub fn snapshot(&self) -> CycleStatsSnapshot {
        CycleStatsSnapshot {
            timestamp: iso8601_now(),
            total_turns: self.turns,
            target_turns: self.target_turns,
            target_rate: self.target_rate(),
            cycles_per_turn: self.cycles_per_turn,
            terminal_states: self.states.clone(),
            cycles: self
                .buckets
                .iter()
                .map(|(cycle, b)| {
                    (
                        format!("cycle_{cycle}"),
                        CycleBucketSnapshot {
                            observations: b.observations,
                            kairos_hits: b.kairos_hits,
                            kairos_probability: rate(b.kairos_hits, b.observations),
                            energy: b.energy,
                            coherence: b.coherence,
                            satisfaction: b.satisfaction,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: &CycleStatsSnapshot) -> Self {
        let mut buckets = BTreeMap::new();
        for (key, b) in &snapshot.cycles {
            let Some(cycle) = key.strip_prefix("cycle_").and_then(|n| n.parse().ok()) else {
                tracing::warn!(bucket = %key, "ignoring malformed cycle bucket");
                continue;
            };
            buckets.insert(
                cycle,
                CycleBucket {
                    observations: b.observations,
                    kairos_hits: b.kairos_hits.min(b.observations),
                    energy: b.energy,
                    coherence: b.coherence,
                    satisfaction: b.satisfaction,
                },
            );
        }
        Self {
            turns: snapshot.total_turns,
            target_turns: snapshot.target_turns.min(snapshot.total_turns),
            states: snapshot.terminal_states.clone(),
            cycles_per_turn: snapshot.cycles_per_turn,
            buckets,
        }
    }
}

// --- gate statistics ---

#[derive(Debug, Clone, Default)]
pub struct GateStatsTracker {
    reports: u64,
    admitted: u64,
    evaluated: BTreeMap<GateStage, u64>,
    passed: BTreeMap<GateStage, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateStageSnapshot {
    pub evaluated: u64,
    pub passed: u64,
    #[serde(default)]
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateStatsSnapshot {
    pub timestamp: String,
    pub reports: u64,
    #[serde(default)]
    pub nexuses_evaluated: u64,
    #[serde(default)]
    pub nexuses_admitted: u64,
    #[serde(default)]
    pub overall_pass_rate: f64,
    #[serde(default)]
    pub stages: BTreeMap<String, GateStageSnapshot>,
}

impl GateStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &GateReport) {
        self.reports += 1;
        for stage in GateStage::ALL {
            let evaluated = report.evaluated.get(&stage).copied().unwrap_or(0) as u64;
            let passed = report.passed.get(&stage).copied().unwrap_or(0) as u64;
            *self.evaluated.entry(stage).or_default() += evaluated;
            *self.passed.entry(stage).or_default() += passed;
        }
        self.admitted += report
            .passed
            .get(&GateStage::Readiness)
            .copied()
            .unwrap_or(0) as u64;
    }

    pub fn record_trace(&mut self, trace: &ConvergenceTrace) {
        for cycle in &trace.cycles {
            self.record(&cycle.gate);
        }
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }

    pub fn pass_rate(&self, stage: GateStage) -> f64 {
        rate(
            self.passed.get(&stage).copied().unwrap_or(0),
            self.evaluated.get(&stage).copied().unwrap_or(0),
        )
    }

    /// Fraction of all evaluated nexuses that cleared every stage.
    pub fn overall_pass_rate(&self) -> f64 {
        rate(self.admitted, self.nexuses_evaluated())
    }

    fn nexuses_evaluated(&self) -> u64 {
        self.evaluated
            .get(&GateStage::Participants)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> GateStatsSnapshot {
        GateStatsSnapshot {
            timestamp: iso8601_now(),
            reports: self.reports,
            nexuses_evaluated: self.nexuses_evaluated(),
            nexuses_admitted: self.admitted,
            overall_pass_rate: self.overall_pass_rate(),
            stages: GateStage::ALL
                .into_iter()
                .map(|stage| {
                    (
                        stage.as_str().to_string(),
                        GateStageSnapshot {
                            evaluated: self.evaluated.get(&stage).copied().unwrap_or(0),
                            passed: self.passed.get(&stage).copied().unwrap_or(0),
                            pass_rate: self.pass_rate(stage),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: &GateStatsSnapshot) -> Self {
        let mut tracker = Self {
            reports: snapshot.reports,
            admitted: snapshot.nexuses_admitted,
            ..Self::default()
        };
        for (name, s) in &snapshot.stages {
            let Some(stage) = GateStage::parse(name) else {
                tracing::warn!(stage = %name, "ignoring unknown gate stage");
                continue;
            };
            tracker.evaluated.insert(stage, s.evaluated);
            tracker.passed.insert(stage, s.passed.min(s.evaluated));
        }
        tracker
    }
}

// --- decision quality ---

/// Width of a confidence bucket.
pub const CONFIDENCE_BUCKET_WIDTH: f64 = 0.05;
const CONFIDENCE_BUCKETS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityBucket {
    pub count: u64,
    pub correct: u64,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub mean_confidence: f64,
}

impl QualityBucket {
    fn push(&mut self, confidence: f64, correct: bool) {
        self.count += 1;
        if correct {
            self.correct += 1;
        }
        self.mean_confidence += (confidence - self.mean_confidence) / self.count as f64;
        self.accuracy = rate(self.correct, self.count);
    }

    fn restored(self) -> Self {
        let correct = self.correct.min(self.count);
        Self {
            count: self.count,
            correct,
            accuracy: rate(correct, self.count),
            mean_confidence: if self.mean_confidence.is_finite() {
                self.mean_confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// Accuracy of downstream decisions against the confidence that preceded them.
#[derive(Debug, Clone, Default)]
pub struct DecisionQualityTracker {
    overall: QualityBucket,
    by_confidence: BTreeMap<usize, QualityBucket>,
    by_context: BTreeMap<String, QualityBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionQualitySnapshot {
    pub timestamp: String,
    pub total: u64,
    pub correct: u64,
    #[serde(default)]
    pub accuracy: f64,
    /// Count-weighted gap between mean confidence and accuracy.
    #[serde(default)]
    pub calibration_error: f64,
    #[serde(default)]
    pub confidence_buckets: BTreeMap<String, QualityBucket>,
    #[serde(default)]
    pub contexts: BTreeMap<String, QualityBucket>,
}

/// Label of the confidence bucket holding `confidence`, e.g. `"0.65-0.70"`.
pub fn confidence_bucket_label(confidence: f64) -> String {
    label(confidence_bucket(confidence))
}

fn confidence_bucket(confidence: f64) -> usize {
    let c = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    // small bias so values on a boundary land in the upper bucket
    (((c / CONFIDENCE_BUCKET_WIDTH) + 1e-9).floor() as usize).min(CONFIDENCE_BUCKETS - 1)
}

fn label(bucket: usize) -> String {
    let lo = bucket as f64 / CONFIDENCE_BUCKETS as f64;
    let hi = (bucket + 1) as f64 / CONFIDENCE_BUCKETS as f64;
    format!("{lo:.2}-{hi:.2}")
}

fn parse_label(key: &str) -> Option<usize> {
    let (lo, _) = key.split_once('-')?;
    let lo: f64 = lo.parse().ok()?;
    Some(confidence_bucket(lo))
}

impl DecisionQualityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, confidence: f64, correct: bool, context: Option<&str>) {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.overall.push(confidence, correct);
        self.by_confidence
            .entry(confidence_bucket(confidence))
            .or_default()
            .push(confidence, correct);
        if let Some(context) = context {
            self.by_context
                .entry(context.to_string())
                .or_default()
                .push(confidence, correct);
        }
    }

    pub fn total(&self) -> u64 {
        self.overall.count
    }

    pub fn accuracy(&self) -> f64 {
        rate(self.overall.correct, self.overall.count)
    }

    pub fn bucket(&self, confidence: f64) -> Option<&QualityBucket> {
        self.by_confidence.get(&confidence_bucket(confidence))
    }

    pub fn context(&self, context: &str) -> Option<&QualityBucket> {
        self.by_context.get(context)
    }

    pub fn calibration_error(&self) -> f64 {
        if self.overall.count == 0 {
            return 0.0;
        }
        let total = self.overall.count as f64;
        self.by_confidence
            .values()
            .map(|b| b.count as f64 / total * (b.mean_confidence - b.accuracy).abs())
            .sum()
    }

    pub fn snapshot(&self) -> DecisionQualitySnapshot {
        DecisionQualitySnapshot {
            timestamp: iso8601_now(),
            total: self.overall.count,
            correct: self.overall.correct,
            accuracy: self.accuracy(),
            calibration_error: self.calibration_error(),
            confidence_buckets: self
                .by_confidence
                .iter()
                .map(|(&b, q)| (label(b), *q))
                .collect(),
            contexts: self.by_context.clone(),
        }
    }

    pub fn from_snapshot(snapshot: &DecisionQualitySnapshot) -> Self {
        let mut by_confidence = BTreeMap::new();
        for (key, bucket) in &snapshot.confidence_buckets {
            match parse_label(key) {
                Some(b) => {
                    by_confidence.insert(b, bucket.restored());
                }
                None => tracing::warn!(bucket = %key, "ignoring malformed confidence bucket"),
            }
        }
        let overall_confidence = if snapshot.total == 0 {
            0.0
        } else {
            by_confidence
                .values()
                .map(|b: &QualityBucket| b.mean_confidence * b.count as f64)
                .sum::<f64>()
                / snapshot.total as f64
        };
        Self {
            overall: QualityBucket {
                count: snapshot.total,
                correct: snapshot.correct,
                accuracy: 0.0,
                mean_confidence: overall_confidence,
            }
            .restored(),
            by_confidence,
            by_context: snapshot
                .contexts
                .iter()
                .map(|(k, b)| (k.clone(), b.restored()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::CycleRecord;
    use approx::assert_abs_diff_eq;

    fn record(cycle: usize, energy: f64, kairos: bool) -> CycleRecord {
        CycleRecord {
            cycle,
            energy_before: energy + 0.15,
            energy_after: energy,
            coherence: 0.8,
            satisfaction: 0.6,
            composed: 3,
            admitted: 2,
            kairos,
            gate: GateReport::default(),
        }
    }

    fn trace(records: Vec<CycleRecord>, state: ConvergenceState) -> ConvergenceTrace {
        let target_cycle_index = records.iter().position(|r| r.kairos);
        ConvergenceTrace {
            state,
            initial_energy: 1.0,
            final_energy: records.last().map(|r| r.energy_after).unwrap_or(1.0),
            target_reached: target_cycle_index.is_some(),
            target_cycle_index,
            cycles: records,
            nexuses: Vec::new(),
            failure: None,
        }
    }

    #[test]
    fn test_welford_matches_population_moments() {
        let mut s = RunningStat::default();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.push(v);
        }
        assert_eq!(s.count, 8);
        assert_abs_diff_eq!(s.mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_running_stat_ignores_nan() {
        let mut s = RunningStat::default();
        s.push(f64::NAN);
        s.push(1.0);
        assert_eq!(s.count, 1);
        assert_eq!(s.ema, 1.0);
    }

    #[test]
    fn test_cycle_tracker_kairos_probability() {
        let mut t = CycleStatsTracker::new();
        t.record(&trace(
            vec![record(0, 0.85, false), record(1, 0.7, false), record(2, 0.55, true)],
            ConvergenceState::ConvergedTarget,
        ));
        t.record(&trace(
            vec![record(0, 0.85, false), record(1, 0.6, true)],
            ConvergenceState::ConvergedTarget,
        ));
        assert_eq!(t.turns(), 2);
        assert_eq!(t.kairos_probability(0), 0.0);
        assert_abs_diff_eq!(t.kairos_probability(1), 0.5);
        assert_eq!(t.kairos_probability(2), 1.0);
        assert_eq!(t.state_count(ConvergenceState::ConvergedTarget), 2);
        assert_eq!(t.target_rate(), 1.0);
    }

    #[test]
    fn test_cycle_snapshot_restores_counts_and_recomputes_rates() {
        let mut t = CycleStatsTracker::new();
        t.record(&trace(
            vec![record(0, 0.85, false), record(1, 0.6, true)],
            ConvergenceState::ConvergedTarget,
        ));
        let mut snap = t.snapshot();
        assert!(snap.cycles.contains_key("cycle_1"));
        // a stale derived rate is ignored
        snap.cycles.get_mut("cycle_1").unwrap().kairos_probability = 0.0;
        snap.cycles.insert(
            "bogus".into(),
            snap.cycles["cycle_0"].clone(),
        );

        let json = serde_json::to_string(&snap).unwrap();
        let back: CycleStatsSnapshot = serde_json::from_str(&json).unwrap();
        let restored = CycleStatsTracker::from_snapshot(&back);
        assert_eq!(restored.turns(), 1);
        assert_eq!(restored.kairos_probability(1), 1.0);
        assert_abs_diff_eq!(restored.mean_energy_at(0).unwrap(), 0.85);
    }

    #[test]
    fn test_gate_tracker_pass_rates() {
        let mut report = GateReport::default();
        for (stage, evaluated, passed) in [
            (GateStage::Participants, 4, 4),
            (GateStage::Coherence, 4, 3),
            (GateStage::SatisfactionWindow, 3, 2),
            (GateStage::Readiness, 2, 1),
        ] {
            report.evaluated.insert(stage, evaluated);
            report.passed.insert(stage, passed);
        }
        let mut t = GateStatsTracker::new();
        t.record(&report);
        t.record(&report);
        assert_eq!(t.reports(), 2);
        assert_abs_diff_eq!(t.pass_rate(GateStage::Coherence), 0.75);
        assert_abs_diff_eq!(t.overall_pass_rate(), 0.25);

        let restored = GateStatsTracker::from_snapshot(&t.snapshot());
        assert_abs_diff_eq!(restored.pass_rate(GateStage::SatisfactionWindow), 2.0 / 3.0);
        assert_abs_diff_eq!(restored.overall_pass_rate(), 0.25);
    }

    #[test]
    fn test_confidence_bucket_labels() {
        assert_eq!(confidence_bucket_label(0.67), "0.65-0.70");
        assert_eq!(confidence_bucket_label(0.70), "0.70-0.75");
        assert_eq!(confidence_bucket_label(0.0), "0.00-0.05");
        assert_eq!(confidence_bucket_label(1.0), "0.95-1.00");
        assert_eq!(confidence_bucket_label(f64::NAN), "0.00-0.05");
    }

    #[test]
    fn test_decision_quality_accuracy_and_contexts() {
        let mut t = DecisionQualityTracker::new();
        t.record(0.66, true, Some("grief"));
        t.record(0.68, false, Some("grief"));
        t.record(0.9, true, None);
        assert_eq!(t.total(), 3);
        assert_abs_diff_eq!(t.accuracy(), 2.0 / 3.0);
        let bucket = t.bucket(0.65).unwrap();
        assert_eq!((bucket.count, bucket.correct), (2, 1));
        assert_abs_diff_eq!(bucket.mean_confidence, 0.67, epsilon = 1e-12);
        assert_abs_diff_eq!(t.context("grief").unwrap().accuracy, 0.5);
        assert!(t.context("joy").is_none());
    }

    #[test]
    fn test_decision_snapshot_round_trip() {
        let mut t = DecisionQualityTracker::new();
        t.record(0.66, true, Some("a"));
        t.record(0.12, false, Some("b"));
        let snap = t.snapshot();
        assert!(snap.confidence_buckets.contains_key("0.65-0.70"));
        assert!(snap.confidence_buckets.contains_key("0.10-0.15"));

        let restored = DecisionQualityTracker::from_snapshot(&snap);
        assert_eq!(restored.total(), 2);
        assert_abs_diff_eq!(restored.accuracy(), 0.5);
        assert_abs_diff_eq!(restored.calibration_error(), t.calibration_error(), epsilon = 1e-12);
    }
}
