use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn cli_renders_demo_scene_headless() {
    let mut cmd = Command::cargo_bin("crystal-renderer").expect("binary exists");
    cmd.args(["--width", "640", "--height", "480", "--frames", "2"]);
    cmd.assert()
        .success()
        .stdout(contains(" - quad -> object 0"))
        .stdout(contains(" - ribbon -> object 2"))
        .stdout(contains("Registered 3 object(s)"))
        .stdout(contains("Frame 0: 3 draw call(s)"))
        .stdout(contains("Frame 1: 3 draw call(s)"))
        .stdout(contains("Origin projects to (320, 240)"))
        .stdout(contains("Surface 640x480 background rgba(0, 0, 0, 1) in <body>"));
}

#[test]
fn cli_attaches_to_named_container() {
    let mut cmd = Command::cargo_bin("crystal-renderer").expect("binary exists");
    cmd.args([
        "--container",
        "viewport",
        "--background",
        "#ff8000",
        "--dimension",
        "2",
    ]);
    cmd.assert()
        .success()
        .stdout(contains("in <viewport>"))
        .stdout(contains("background rgba(255, 128, 0, 1)"));
}

#[test]
fn cli_rejects_unknown_arguments() {
    let mut cmd = Command::cargo_bin("crystal-renderer").expect("binary exists");
    cmd.arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --summary-only"));
}

#[test]
fn cli_loads_json_config_and_applies_overrides() {
    let mut config = NamedTempFile::new().expect("temp config");
    write!(
        config,
        r#"{{ "width": 200, "height": 100, "dimension": 2, "container_id": "stage" }}"#
    )
    .expect("write config");

    let mut cmd = Command::cargo_bin("crystal-renderer").expect("binary exists");
    cmd.arg("--config").arg(config.path()).args(["--width", "300"]);
    cmd.assert()
        .success()
        .stdout(contains("Origin projects to (150, 50)"))
        .stdout(contains("Surface 300x100 background rgba(0, 0, 0, 1) in <stage>"));
}

#[test]
fn cli_reports_invalid_config() {
    let mut config = NamedTempFile::new().expect("temp config");
    write!(config, r#"{{ "dimension": 5 }}"#).expect("write config");

    let mut cmd = Command::cargo_bin("crystal-renderer").expect("binary exists");
    cmd.arg("--config").arg(config.path());
    cmd.assert()
        .failure()
        .stderr(contains("unsupported dimension 5"));
}
