#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn oncall_sync() -> Command {
    let mut cmd = Command::cargo_bin("oncall-sync").unwrap();
    cmd.env_remove("PAGERDUTY_TOKEN").env_remove("SLACK_TOKEN");
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) -> String {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path.to_string_lossy().into_owned()
}

const VALID_CONFIG: &str = r#"
syncs:
  - name: platform
    schedules:
      - id: P123
        userGroups:
          - handle: platform-oncall
      - name: Platform Secondary
        userGroups:
          - handle: platform-oncall
          - name: SRE
    channel:
      name: platform
    template: "primary: <@{{.Platform}}>"
  - name: data
    schedules:
      - id: P456
        userGroups:
          - id: S42
"#;

// ---------------------------------------------------------------------------
// oncall-sync validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, VALID_CONFIG);

    oncall_sync()
        .args(["validate", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("platform"))
        .stdout(predicate::str::contains("data"))
        .stdout(predicate::str::contains("configuration is valid"));
}

#[test]
fn validate_accepts_legacy_top_level_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &VALID_CONFIG.replace("syncs:", "slackSyncs:"));

    oncall_sync()
        .args(["validate", "--config", &config])
        .assert()
        .success();
}

#[test]
fn validate_json_applies_overrides() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, VALID_CONFIG);

    oncall_sync()
        .args(["validate", "--json", "--dry-run", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""dryRun": true"#))
        .stdout(predicate::str::contains(r#""dryRun": false"#).not());
}

#[test]
fn validate_from_flags() {
    oncall_sync()
        .args([
            "validate",
            "--schedule",
            "id=P123;userGroup=handle=oncall",
            "--channel-id",
            "C123",
            "--template",
            "on call: {{ .Primary }}",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("default"));
}

#[test]
fn validate_reads_template_file() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("topic.tmpl");
    std::fs::write(&template, "on call: {{.Primary}}\n").unwrap();

    oncall_sync()
        .args(["validate", "--json", "--schedule", "id=P123", "--channel-name", "ops"])
        .arg("--template-file")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""template": "on call: {{.Primary}}""#));
}

#[test]
fn validate_rejects_template_without_channel() {
    oncall_sync()
        .args(["validate", "--schedule", "id=P123", "--template", "{{.Primary}}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "must specify either channel ID or channel name when template is given",
        ));
}

#[test]
fn validate_rejects_channel_without_template() {
    oncall_sync()
        .args(["validate", "--schedule", "id=P123", "--channel-id", "C1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must specify template"));
}

#[test]
fn validate_rejects_duplicate_sync_names() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
syncs:
  - name: twice
    schedules: [{id: P1}]
  - name: twice
    schedules: [{id: P2}]
"#,
    );

    oncall_sync()
        .args(["validate", "--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"sync name "twice" already used"#));
}

#[test]
fn validate_rejects_malformed_schedule_specifier() {
    oncall_sync()
        .args(["validate", "--schedule", "id=P1;name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing separator"));
}

#[test]
fn validate_rejects_unparsable_template() {
    oncall_sync()
        .args([
            "validate",
            "--schedule",
            "id=P1",
            "--channel-id",
            "C1",
            "--template",
            "{{.Primary",
        ])
        .assert()
        .failure();
}

#[test]
fn validate_reports_missing_config_file() {
    oncall_sync()
        .args(["validate", "--config", "/nonexistent/oncall-sync.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config file"));
}

#[test]
fn config_conflicts_with_schedule_flags() {
    oncall_sync()
        .args(["validate", "--config", "x.yaml", "--schedule", "id=P1"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// oncall-sync sync
// ---------------------------------------------------------------------------

#[test]
fn sync_requires_api_tokens() {
    oncall_sync()
        .args(["sync", "--schedule", "id=P1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pagerduty-token"));
}

#[test]
fn sync_validates_before_contacting_apis() {
    oncall_sync()
        .args([
            "sync",
            "--pagerduty-token",
            "pd",
            "--slack-token",
            "xoxb",
            "--pagerduty-url",
            "http://127.0.0.1:9",
            "--slack-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one schedule"));
}
