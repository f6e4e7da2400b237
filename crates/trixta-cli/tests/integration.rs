#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn trixta() -> Command {
    let mut cmd = Command::cargo_bin("trixta").unwrap();
    cmd.env_remove("TRIXTA_NAMESPACE")
        .env_remove("TRIXTA_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

const SCENARIO: &str = r#"
roles:
  - name: viewer
contracts:
  viewer:
    contract_actions: { ping: {} }
    contract_reactions: { alert: { type: requestForResponse } }
replies:
  - { role: viewer, event: ping, ok: { pong: true } }
steps:
  - submit_action: { role: viewer, action: ping, form_data: { x: 1 }, response_event: DONE }
  - emit_reaction: { role: viewer, reaction: alert, payload: { ref: abc } }
  - wait_ms: 20
  - respond: { role: viewer, reaction: alert, ref: abc, form_data: { ok: true } }
settle_ms: 200
"#;

// ---------------------------------------------------------------------------
// trixta topic
// ---------------------------------------------------------------------------

#[test]
fn topic_uses_default_namespace() {
    trixta()
        .args(["topic", "viewer"])
        .assert()
        .success()
        .stdout("trixta_role:viewer\n");
}

#[test]
fn topic_honors_namespace_flag_and_json() {
    let value = json_output(trixta().args(["topic", "viewer", "--namespace", "ns", "--json"]));
    assert_eq!(value["topic"], "ns:viewer");
}

#[test]
fn topic_rejects_empty_role() {
    trixta()
        .args(["topic", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("role name must not be empty"));
}

// ---------------------------------------------------------------------------
// trixta config
// ---------------------------------------------------------------------------

#[test]
fn config_init_then_check_is_clean() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trixta.yaml");
    trixta()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    trixta()
        .args(["config", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "trixta.yaml", "namespace: keep\n");
    trixta()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "namespace: keep\n");
}

#[test]
fn config_check_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "trixta.yaml", "namespace: \"a:b\"\n");
    trixta()
        .args(["config", "check"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_check_reports_warnings_as_json() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "trixta.yaml",
        "instances:\n  overrides:\n    bogus: { type: accumulate }\n",
    );
    let value = json_output(trixta().args(["config", "check", "--json"]).arg(&path));
    let warnings = value["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["level"], "warning");
}

#[test]
fn config_check_missing_file_fails() {
    trixta()
        .args(["config", "check", "/nonexistent/trixta.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ---------------------------------------------------------------------------
// trixta simulate
// ---------------------------------------------------------------------------

#[test]
fn simulate_runs_a_full_round_trip() {
    let dir = TempDir::new().unwrap();
    let scenario = write(&dir, "scenario.yaml", SCENARIO);
    let value = json_output(trixta().arg("simulate").arg(&scenario).arg("--json"));

    let pushes: Vec<(&str, &str)> = value["calls"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["call"] == "push")
        .map(|c| (c["topic"].as_str().unwrap(), c["event"].as_str().unwrap()))
        .collect();
    assert!(pushes.contains(&("trixta_role:viewer", "ping")));
    assert!(pushes.contains(&("trixta_role:viewer", "reply:abc")));

    let events = value["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|e| e["type"] == "custom" && e["event_type"] == "DONE" && e["data"]["pong"] == true));

    let state = &value["state"];
    assert_eq!(state["roles"][0]["name"], "viewer");
    assert_eq!(state["statuses"]["viewer:ping"]["loading"], false);
    assert_eq!(state["statuses"]["viewer:alert:abc"]["loading"], false);
    assert_eq!(
        state["reactions"]["viewer:alert"]["instances"][0]["ref"],
        "abc"
    );
    assert!(state["error"].is_null());
}

#[test]
fn simulate_uses_config_namespace() {
    let dir = TempDir::new().unwrap();
    let scenario = write(&dir, "scenario.yaml", "roles: [{ name: viewer }]\nsettle_ms: 50\n");
    let config = write(&dir, "trixta.yaml", "namespace: ns\n");
    let value = json_output(
        trixta()
            .arg("simulate")
            .arg(&scenario)
            .arg("--config")
            .arg(&config)
            .arg("--json"),
    );
    assert_eq!(value["calls"][0]["topic"], "ns:viewer");
}

#[test]
fn simulate_prints_event_table() {
    let dir = TempDir::new().unwrap();
    let scenario = write(&dir, "scenario.yaml", SCENARIO);
    trixta()
        .arg("simulate")
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("role_declared"))
        .stdout(predicate::str::contains("viewer:alert:abc"))
        .stdout(predicate::str::contains("roles: viewer"));
}

#[test]
fn simulate_fails_when_reaction_is_never_subscribed() {
    let dir = TempDir::new().unwrap();
    let scenario = write(
        &dir,
        "scenario.yaml",
        "roles: [{ name: viewer }]\nsteps:\n  - emit_reaction: { role: viewer, reaction: alert }\n",
    );
    trixta()
        .arg("simulate")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("step 1: cannot emit 'alert'"));
}

#[test]
fn simulate_rejects_unknown_scenario_fields() {
    let dir = TempDir::new().unwrap();
    let scenario = write(&dir, "scenario.yaml", "rolez: []\n");
    trixta()
        .arg("simulate")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse scenario"));
}
