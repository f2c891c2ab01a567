use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[rstest]
fn probe_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let toml = r#"
[sensor]
sample_hz = 10.0
read_timeout_ms = 5
"#;
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();

    let mut cmd = Command::cargo_bin("roast").unwrap();
    cmd.current_dir(dir.path());
    cmd.env("ROAST_TEST_SIM_TIMEOUT", "1");
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert()
        .code(4)
        .stdout(predicate::str::contains(
            "What happened: The temperature probe did not answer",
        ));
}

#[rstest]
fn live_run_survives_probe_timeouts() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[sensor]\nsample_hz = 20.0\nread_timeout_ms = 5\n").unwrap();

    let mut cmd = Command::cargo_bin("roast").unwrap();
    cmd.current_dir(dir.path());
    cmd.env("ROAST_TEST_SIM_TIMEOUT", "1");
    cmd.arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-s", "0.4"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no data").or(predicate::str::contains("reading late")));
}
