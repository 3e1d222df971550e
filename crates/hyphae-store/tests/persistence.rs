//! On-disk behavior of the data directory across process restarts.

use std::fs;

use approx::assert_abs_diff_eq;
use hyphae_core::{CouplingMatrix, HyphaeEngine, Organ, StaticActivations};
use hyphae_store::{CouplingStore, HyphaeStore};
use serde_json::{Value, json};
use tempfile::TempDir;

fn sense_turn(engine: &mut HyphaeEngine, organs: &[&str]) {
    let maps = organs
        .iter()
        .map(|o| {
            (
                o.to_string(),
                [("sense".to_string(), 0.8)].into_iter().collect(),
            )
        })
        .collect();
    engine.process_turn(&mut StaticActivations(maps));
}

#[test]
fn corrupt_coupling_file_starts_from_identity() {
    let dir = TempDir::new().unwrap();
    let store = HyphaeStore::open(Some(dir.path())).unwrap();
    fs::write(store.coupling_path(), "{ not json").unwrap();

    let engine = store.load_engine().unwrap();
    assert!(engine.coupling().is_identity());
    assert_eq!(engine.coupling().size(), Organ::COUNT);
}

#[test]
fn repeated_organ_names_in_file_start_from_identity() {
    let dir = TempDir::new().unwrap();
    let store = HyphaeStore::open(Some(dir.path())).unwrap();
    let doc = json!({
        "r_matrix": [[1, 0], [0, 1]],
        "metadata": {"shape": [2, 2], "learning_rate": 0.05, "organs": ["EMPATHY", "EMPATHY"]}
    });
    fs::write(store.coupling_path(), doc.to_string()).unwrap();

    let mut engine = store.load_engine().unwrap();
    assert!(engine.coupling().is_identity());

    store.checkpoint(&mut engine).unwrap();
    let reloaded = store.load_engine().unwrap();
    assert!(reloaded.coupling().is_identity());
}

#[test]
fn legacy_five_by_five_embeds_upper_left() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coupling.json");
    let mut legacy = vec![vec![0.0; 5]; 5];
    for (i, row) in legacy.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    legacy[0][1] = 0.3;
    legacy[1][0] = 0.3;
    legacy[2][4] = 0.12;
    legacy[4][2] = 0.12;
    fs::write(&path, json!({ "r_matrix": legacy }).to_string()).unwrap();

    let m = CouplingStore::new(&path, Organ::roster(), 0.05).load().unwrap();
    assert_eq!(m.size(), 11);
    assert_eq!(m.get("LISTENING", "EMPATHY"), 0.3);
    assert_eq!(m.get("WISDOM", "PRESENCE"), 0.12);
    assert_eq!(m.get("BOND", "SANS"), 0.0);
    assert_eq!(m.get("CARD", "CARD"), 1.0);
    assert!(m.is_symmetric());
}

#[test]
fn oversized_unnamed_matrix_falls_back_to_identity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coupling.json");
    let big: Vec<Vec<f64>> = (0..12)
        .map(|i| (0..12).map(|j| if i == j { 1.0 } else { 0.1 }).collect())
        .collect();
    fs::write(&path, json!({ "r_matrix": big }).to_string()).unwrap();

    let store = CouplingStore::new(&path, Organ::roster(), 0.05);
    assert!(store.load().is_err());
    assert!(store.load_or_identity().unwrap().is_identity());
}

#[test]
fn named_document_merges_by_organ() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coupling.json");
    let doc = json!({
        "r_matrix": [[1.0, 0.4], [0.4, 1.0]],
        "metadata": {
            "shape": [2, 2],
            "learning_rate": 0.05,
            "total_updates": 9,
            "organs": ["RNX", "WISDOM"],
            "saved_at": "2026-01-01T00:00:00Z"
        }
    });
    fs::write(&path, doc.to_string()).unwrap();

    let m = CouplingStore::new(&path, Organ::roster(), 0.05).load().unwrap();
    assert_eq!(m.get("WISDOM", "RNX"), 0.4);
    assert_eq!(m.total_updates(), 9);
    assert_eq!(m.get("EMPATHY", "WISDOM"), 0.0);
}

#[test]
fn restart_resumes_learning() {
    let dir = TempDir::new().unwrap();
    let store = HyphaeStore::open(Some(dir.path())).unwrap();
    store.ensure_defaults().unwrap();

    let mut engine = store.load_engine().unwrap();
    sense_turn(&mut engine, &["EMPATHY", "WISDOM"]);
    let after_one = engine.coupling().get("EMPATHY", "WISDOM");
    assert!(after_one > 0.0);
    store.checkpoint(&mut engine).unwrap();

    let mut resumed = store.load_engine().unwrap();
    assert_abs_diff_eq!(resumed.coupling().get("EMPATHY", "WISDOM"), after_one);
    sense_turn(&mut resumed, &["EMPATHY", "WISDOM"]);
    assert!(resumed.coupling().get("EMPATHY", "WISDOM") > after_one);
    assert_eq!(resumed.cycle_stats().turns(), 2);
}

#[test]
fn checkpoint_keeps_foreign_keys_in_coupling_file() {
    let dir = TempDir::new().unwrap();
    let store = HyphaeStore::open(Some(dir.path())).unwrap();
    fs::write(store.coupling_path(), r#"{"family_count": 3}"#).unwrap();

    let mut engine = store.load_engine().unwrap();
    store.checkpoint(&mut engine).unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(store.coupling_path()).unwrap())
        .unwrap();
    assert_eq!(raw["family_count"], 3);
    assert_eq!(raw["metadata"]["organs"].as_array().unwrap().len(), 11);
    assert!(store.cycle_stats_path().exists());
    assert!(store.gate_stats_path().exists());
    assert!(store.decision_quality_path().exists());
    let reloaded = CouplingStore::new(store.coupling_path(), Organ::roster(), 0.05)
        .load()
        .unwrap();
    assert_eq!(reloaded, CouplingMatrix::default_roster());
}
