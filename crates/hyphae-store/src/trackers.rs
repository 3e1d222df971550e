//! Tracker snapshot documents: one JSON file per tracker.

use std::path::Path;

use hyphae_core::{
    CycleStatsSnapshot, CycleStatsTracker, DecisionQualitySnapshot, DecisionQualityTracker,
    GateStatsSnapshot, GateStatsTracker,
};
use serde::de::DeserializeOwned;

use crate::document::{read_json_opt, write_json};
use crate::error::Result;

/// Snapshot at `path`, or `None` when missing or unreadable.
fn load_lenient<T: DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    match read_json_opt(path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(path = %path.display(), "{what} unreadable, starting fresh: {e}");
            None
        }
    }
}

pub fn load_cycle_stats(path: &Path) -> CycleStatsTracker {
    load_lenient::<CycleStatsSnapshot>(path, "cycle stats")
        .map(|s| CycleStatsTracker::from_snapshot(&s))
        .unwrap_or_default()
}

pub fn load_gate_stats(path: &Path) -> GateStatsTracker {
    load_lenient::<GateStatsSnapshot>(path, "gate stats")
        .map(|s| GateStatsTracker::from_snapshot(&s))
        .unwrap_or_default()
}

pub fn load_decision_quality(path: &Path) -> DecisionQualityTracker {
    load_lenient::<DecisionQualitySnapshot>(path, "decision quality")
        .map(|s| DecisionQualityTracker::from_snapshot(&s))
        .unwrap_or_default()
}

pub fn save_cycle_stats(path: &Path, tracker: &CycleStatsTracker) -> Result<()> {
    write_json(path, &tracker.snapshot())
}

pub fn save_gate_stats(path: &Path, tracker: &GateStatsTracker) -> Result<()> {
    write_json(path, &tracker.snapshot())
}

pub fn save_decision_quality(path: &Path, tracker: &DecisionQualityTracker) -> Result<()> {
    write_json(path, &tracker.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_decision_quality_resumes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decision_quality.json");
        let mut t = DecisionQualityTracker::new();
        t.record(0.66, true, Some("support"));
        t.record(0.67, false, Some("support"));
        save_decision_quality(&path, &t).unwrap();

        let mut resumed = load_decision_quality(&path);
        resumed.record(0.68, true, None);
        assert_eq!(resumed.total(), 3);
        assert_eq!(resumed.bucket(0.65).unwrap().count, 3);
        assert_eq!(resumed.context("support").unwrap().count, 2);

        let raw: serde_json::Value = crate::document::read_json(&path).unwrap();
        assert!(raw["timestamp"].is_string());
        assert_eq!(raw["confidence_buckets"]["0.65-0.70"]["correct"], 1);
    }

    #[test]
    fn test_corrupt_tracker_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gate_stats.json");
        std::fs::write(&path, "{ broken").unwrap();
        assert_eq!(load_gate_stats(&path).reports(), 0);
        assert_eq!(load_cycle_stats(&dir.path().join("absent.json")).turns(), 0);
    }
}
