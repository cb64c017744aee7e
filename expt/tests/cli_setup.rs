//! CLI tests for `expt setup`, `expt sweep`, and `expt status`.
//!
//! Spawns the expt binary inside a fixture control directory and checks exit
//! codes and diagnostics.

use std::process::{Command, Output};

use expt::exit_codes;
use expt::test_support::TestExperiment;

fn run_expt(fixture: &TestExperiment, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_expt"))
        .current_dir(fixture.control_dir())
        .args(args)
        .output()
        .expect("run expt")
}

#[test]
fn blocked_setup_exits_non_zero_with_diagnostic() {
    let fixture = TestExperiment::new().expect("experiment");

    let first = run_expt(&fixture, &["setup"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    assert!(fixture.work_link().is_dir());

    let blocked = run_expt(&fixture, &["setup"]);
    assert_eq!(blocked.status.code(), Some(exit_codes::CONFLICT));
    let stderr = String::from_utf8_lossy(&blocked.stderr);
    assert!(stderr.contains("work path already exists"), "{stderr}");

    let forced = run_expt(&fixture, &["setup", "--force"]);
    assert!(forced.status.success(), "{}", String::from_utf8_lossy(&forced.stderr));
}

#[test]
fn setup_json_reports_work_directory() {
    let fixture = TestExperiment::new().expect("experiment");

    let out = run_expt(&fixture, &["setup", "--json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["policy"]["sweep"], false);
    assert_eq!(report["policy"]["force"], false);
    assert_eq!(report["work"]["inputs"].as_array().map(Vec::len), Some(3));
    let target = report["work"]["target"].as_str().expect("target path");
    assert!(target.contains("/work/ctrl_"), "{target}");
}

#[test]
fn sweep_and_status_track_work_directory() {
    let fixture = TestExperiment::new().expect("experiment");

    let status = run_expt(&fixture, &["status"]);
    assert!(status.status.success());
    assert_eq!(String::from_utf8_lossy(&status.stdout).trim(), "work_absent");

    assert!(run_expt(&fixture, &["setup"]).status.success());
    let status = run_expt(&fixture, &["status"]);
    assert_eq!(String::from_utf8_lossy(&status.stdout).trim(), "work_ready");

    let sweep = run_expt(&fixture, &["sweep"]);
    assert!(sweep.status.success());
    assert_eq!(String::from_utf8_lossy(&sweep.stdout).trim(), "sweep: removed=true");
    assert!(std::fs::symlink_metadata(fixture.work_link()).is_err());
}

#[test]
fn missing_input_exits_with_missing_input_code() {
    let fixture = TestExperiment::new().expect("experiment");
    std::fs::remove_file(fixture.control_dir().join("input.nml")).expect("remove nml");

    let out = run_expt(&fixture, &["setup"]);

    assert_eq!(out.status.code(), Some(exit_codes::MISSING_INPUT));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("input.nml"), "{stderr}");
}

#[test]
fn init_creates_laboratory_from_flag() {
    let fixture = TestExperiment::new().expect("experiment");
    let lab = fixture.root().join("new-lab");

    let out = run_expt(
        &fixture,
        &["init", "--laboratory", lab.to_str().expect("utf-8 path")],
    );

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    for subdir in ["bin", "input", "archive", "codebase"] {
        assert!(lab.join(subdir).is_dir(), "{subdir}");
    }
}
