//! CLI command integration tests.
//! Each test uses a temp directory via HYPHAE_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DISTRESS_TEXT: &str =
    "I feel overwhelmed and scared, I can't breathe. It keeps happening again.";

fn hyphae_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("hyphae").unwrap();
    cmd.env("HYPHAE_DATA_DIR", data_dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn stats_fresh_directory() {
    let dir = TempDir::new().unwrap();
    hyphae_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("turns:         0"))
        .stdout(predicate::str::contains("journal:       0 turns"));

    assert!(dir.path().join("config.toml").exists());
    assert!(dir.path().join("synonyms.json").exists());
}

#[test]
fn turn_prints_nexuses_and_learns() {
    let dir = TempDir::new().unwrap();
    hyphae_cmd(&dir)
        .args(["turn", DISTRESS_TEXT])
        .assert()
        .success()
        .stdout(predicate::str::contains("state:"))
        .stdout(predicate::str::contains("sense"))
        .stdout(predicate::str::contains("coupling updates"))
        .stdout(predicate::str::contains("pathways from"));

    assert!(dir.path().join("coupling.json").exists());
    assert!(dir.path().join("journal.db").exists());

    hyphae_cmd(&dir)
        .args(["matrix", "--top", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("strongest pairs:"));

    hyphae_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("turns:         1"))
        .stdout(predicate::str::contains("journal:       1 turns, 1 learned"));
}

#[test]
fn turn_json_output() {
    let dir = TempDir::new().unwrap();
    let doc = json_stdout(hyphae_cmd(&dir).args(["--json", "turn", DISTRESS_TEXT]));
    assert_eq!(doc["outcome"]["turn"], 1);
    assert!(!doc["outcome"]["trace"]["nexuses"].as_array().unwrap().is_empty());
    let score = doc["healing_score"].as_f64().unwrap();
    assert!((-1.0..=1.0).contains(&score));
}

#[test]
fn turn_without_agreement_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    hyphae_cmd(&dir)
        .args(["turn", "the weather report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nexuses:      0"))
        .stdout(predicate::str::contains("learned:      no"));
}

#[test]
fn compose_from_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("activations.json");
    std::fs::write(
        &input,
        r#"{"EMPATHY": {"feel": 0.9}, "WISDOM": {"sense": 0.75}, "BOND": {"trust": 0.4}}"#,
    )
    .unwrap();

    hyphae_cmd(&dir)
        .arg("compose")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("sense"))
        .stdout(predicate::str::contains("organs=EMPATHY,WISDOM"));
}

#[test]
fn compose_rejects_out_of_range_activation() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    std::fs::write(&input, r#"{"EMPATHY": {"sense": 1.5}}"#).unwrap();

    hyphae_cmd(&dir)
        .arg("compose")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid activation map"));
}

#[test]
fn reset_backs_up_existing_matrix() {
    let dir = TempDir::new().unwrap();
    hyphae_cmd(&dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to back up"));

    hyphae_cmd(&dir).args(["turn", DISTRESS_TEXT]).assert().success();

    hyphae_cmd(&dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("backed up to"));

    let backups = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count();
    assert_eq!(backups, 1);

    let doc = json_stdout(hyphae_cmd(&dir).args(["--json", "matrix"]));
    assert_eq!(doc["metadata"]["total_updates"], 0);
    assert_eq!(doc["r_matrix"][1][7], 0.0);
}

#[test]
fn train_is_reproducible_by_seed() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let run = |dir: &TempDir| {
        json_stdout(hyphae_cmd(dir).args(["--json", "train", "--turns", "25", "--seed", "7"]))
    };
    let first = run(&a);
    let second = run(&b);
    assert_eq!(first, second);
    assert_eq!(first["turns"], 25);
    assert!(first["total_updates"].as_u64().unwrap() > 0);

    hyphae_cmd(&a)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("turns:         25"))
        .stdout(predicate::str::contains("decisions:     25"));
}

#[test]
fn pathways_from_fragmented() {
    let dir = TempDir::new().unwrap();
    hyphae_cmd(&dir)
        .args([
            "pathways",
            "--type",
            "Fragmented",
            "--energy",
            "0.3",
            "--satisfaction",
            "0.7",
            "--mutual",
            "0.8",
            "--rhythm",
            "0.9",
            "--relational",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Relational"))
        .stdout(predicate::str::contains("p=0.648"))
        .stdout(predicate::str::contains("healing:      1.000"));
}

#[test]
fn pathways_unknown_type_maintains() {
    let dir = TempDir::new().unwrap();
    let doc = json_stdout(hyphae_cmd(&dir).args(["--json", "pathways", "--type", "Mystery"]));
    let pathways = doc["pathways"].as_array().unwrap();
    assert_eq!(pathways.len(), 1);
    assert_eq!(pathways[0]["target"], "Mystery");
    assert_eq!(pathways[0]["probability"], 1.0);
    assert_eq!(doc["healing_score"], 0.0);
}
