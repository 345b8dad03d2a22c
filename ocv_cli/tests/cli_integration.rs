use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Single-cell pack with a fixed 100 ms cadence so trace rows map 1:1 to ticks.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let store = dir.path().join("store");
    let toml = format!(
        r#"
[pack]
cells = 1

[sensors]
voltage = "RxBt"
throttle = "thr"

[rate]
adaptive = false
fixed_period_ms = 100

[persistence]
dir = "{}"
warmup_ms = 1000
"#,
        store.display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

/// Idle at 3.80 V, a sagging punch-out, then a recovery at 3.79 V.
fn write_trace(dir: &Path) -> PathBuf {
    let path = dir.join("flight.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "time_ms,RxBt,thr").unwrap();
    let mut t = 0;
    while t < 13_000 {
        let (v, thr) = match t {
            0..5_000 => (3.80, 0),
            5_000..8_000 => (3.50, 100),
            _ => (3.79, 0),
        };
        writeln!(f, "{t},{v},{thr}").unwrap();
        t += 100;
    }
    path
}

fn ocv() -> Command {
    Command::cargo_bin("ocv").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
#[case(&["simulate", "--seconds", "5"], 0, "OCV Summary", "stdout")]
#[case(&["simulate", "--seconds", "5", "--profile", "0:1000,150:1000"], 1, "outside 0..=100", "stderr")]
#[case(&["inspect", "--model", "Nobody"], 0, "No stored record", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = ocv();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn replay_then_inspect_shows_learned_record() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = write_trace(dir.path());

    ocv()
        .arg("--config")
        .arg(&cfg)
        .args(["replay", "--model", "Test Quad", "--every", "10", "--trace"])
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("--- OCV Summary ---"))
        .stdout(predicate::str::contains("Persistence: ready"));

    assert!(dir.path().join("store").join("Test_Quad.ocv").exists());

    ocv()
        .arg("--config")
        .arg(&cfg)
        .args(["inspect", "--model", "Test Quad"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Record: Test_Quad"))
        .stdout(predicate::str::contains("Recovery delay:"));
}

#[rstest]
fn replay_json_lines_parse() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = write_trace(dir.path());

    let out = ocv()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["replay", "--every", "5", "--trace"])
        .arg(&trace)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);

    let mut estimates = 0;
    let mut summary = None;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let v: serde_json::Value = serde_json::from_str(line)
            .unwrap_or_else(|e| panic!("not JSON ({e}): {line}"));
        if v.get("summary").is_some() {
            summary = Some(v);
        } else {
            assert!(v["percent"].as_f64().unwrap() >= 0.0);
            assert!(v["phase"].is_string());
            estimates += 1;
        }
    }
    assert_eq!(estimates, 26, "130 rows printed every 5th");
    let s = summary.expect("summary line");
    assert_eq!(s["summary"]["ticks"], 130);
    assert_eq!(s["summary"]["skipped"], 0);
    assert!(s["summary"]["saves"].as_u64().unwrap() >= 1);
}

#[rstest]
fn replay_rejects_trace_without_sensor_columns() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let bad = dir.path().join("bad.csv");
    fs::write(&bad, "time_ms,volts,thr\n0,3.8,0\n").unwrap();

    ocv()
        .arg("--config")
        .arg(&cfg)
        .args(["replay", "--trace"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn corrupt_record_is_reported_with_json_reason() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let store = dir.path().join("store");
    fs::create_dir_all(&store).unwrap();
    fs::write(store.join("Test_Quad.ocv"), "OCVCOMP1\nBUCKETS=8\n").unwrap();

    let out = ocv()
        .args(["--json", "--config"])
        .arg(&cfg)
        .args(["inspect", "--model", "Test_Quad"])
        .assert()
        .code(4)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no JSON error line; stderr was: {stderr}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "RecordRejected");
}

#[rstest]
#[case("[pack]\ncells = 0\n", "pack.cells")]
#[case("[sensors]\nvoltage = \"RxBt\"\n", "not valid TOML")]
fn bad_config_is_explained(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();

    ocv()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains(needle));
}
