//! Lifecycle tests: init, fresh setup, blocked re-setup, forced and swept
//! re-setup, all against one laboratory and control directory.

use std::fs;
use std::path::Path;

use expt::core::policy::SetupPolicy;
use expt::error::SetupError;
use expt::io::config::CONFIG_FILE;
use expt::io::lab::Laboratory;
use expt::io::work::WorkDirectory;
use expt::models::Model;
use expt::setup::{SetupOptions, run_init, run_setup};
use expt::test_support::{INPUT_COUNT, TEST_EXE, TestExperiment, input_name, input_size};

const VERSION: &str = "1.0.0";

fn policy(sweep: bool, force: bool) -> SetupPolicy {
    SetupPolicy { sweep, force }
}

/// Every post-condition a completed setup guarantees.
fn assert_work_ready(expt: &TestExperiment, work: &WorkDirectory) {
    let link = expt.work_link();
    assert!(
        fs::symlink_metadata(&link)
            .expect("work link")
            .file_type()
            .is_symlink()
    );
    assert!(link.is_dir());
    assert_eq!(work.link, link);

    let bin_exe = expt.lab_path().join("bin").join(TEST_EXE);
    assert_eq!(
        fs::canonicalize(link.join(TEST_EXE)).expect("resolve work exe"),
        fs::canonicalize(&bin_exe).expect("resolve bin exe")
    );

    for name in Model::Test.config_files().iter().copied().chain([CONFIG_FILE]) {
        assert!(link.join(name).is_file(), "{name} missing from work");
    }

    for i in 1..=INPUT_COUNT {
        let staged = link.join(input_name(i));
        let size = fs::metadata(&staged).expect("stat input").len();
        assert_eq!(size, 1000_u64.pow(2) + i, "{}", staged.display());
        assert_eq!(size, input_size(i));
    }
}

fn snapshot(dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    entries
}

#[test]
fn init_creates_layout_and_is_idempotent() {
    let expt = TestExperiment::new().expect("experiment");
    let lab_root = expt.root().join("fresh-lab");

    let lab = run_init(&lab_root).expect("init");
    for subdir in ["bin", "input", "archive", "codebase"] {
        assert!(lab_root.join(subdir).is_dir(), "{subdir}");
    }

    fs::write(lab.input_dir.join("keep.nc"), b"keep").expect("write");
    let again = run_init(&lab_root).expect("second init");
    assert_eq!(again, lab);
    assert!(lab.input_dir.join("keep.nc").is_file());
    assert!(Laboratory::new(&lab_root).is_initialized());
}

#[test]
fn setup_blocks_then_force_restores_postconditions() {
    let expt = TestExperiment::new().expect("experiment");

    let work = run_setup(&expt.options(policy(false, false), VERSION), expt.config())
        .expect("fresh setup");
    assert_work_ready(&expt, &work);

    let before = snapshot(&work.target);
    let err = run_setup(&expt.options(policy(false, false), VERSION), expt.config()).unwrap_err();
    assert!(matches!(err, SetupError::SetupConflict { .. }), "{err}");
    assert!(err.to_string().contains("work path already exists"));
    assert_eq!(snapshot(&work.target), before);
    assert_eq!(
        fs::canonicalize(expt.work_link()).expect("resolve"),
        work.target
    );

    let forced = run_setup(&expt.options(policy(false, true), VERSION), expt.config())
        .expect("forced setup");
    assert_work_ready(&expt, &forced);
    assert_eq!(forced.target, work.target);
}

#[test]
fn blocked_setup_does_not_create_another_laboratory() {
    let expt = TestExperiment::new().expect("experiment");
    run_setup(&expt.options(policy(false, false), VERSION), expt.config()).expect("fresh setup");
    let other = expt.root().join("other-lab");

    let options = SetupOptions {
        lab_path: Some(other.as_path()),
        ..expt.options(policy(false, false), VERSION)
    };
    let err = run_setup(&options, expt.config()).unwrap_err();

    assert!(matches!(err, SetupError::SetupConflict { .. }), "{err}");
    assert!(!other.exists(), "refused setup created {}", other.display());
}

#[test]
fn sweep_recreates_work_directory() {
    let expt = TestExperiment::new().expect("experiment");
    let first = run_setup(&expt.options(policy(false, false), VERSION), expt.config())
        .expect("fresh setup");
    fs::write(first.target.join("ocean.stats"), b"old run").expect("write output");

    let second = run_setup(&expt.options(policy(true, false), VERSION), expt.config())
        .expect("swept setup");

    assert_work_ready(&expt, &second);
    assert!(!second.target.join("ocean.stats").exists());
    assert_eq!(snapshot(&expt.lab_path().join("work")).len(), 1);
}

#[test]
fn interrupted_setup_recovers_with_force() {
    let expt = TestExperiment::new().expect("experiment");
    let work = run_setup(&expt.options(policy(false, false), VERSION), expt.config())
        .expect("fresh setup");

    // Simulate a partially populated work directory.
    fs::remove_file(work.target.join(TEST_EXE)).expect("remove exe");
    fs::remove_file(work.target.join(input_name(2))).expect("remove input");
    fs::remove_file(work.target.join("diag")).expect("remove diag");

    let forced = run_setup(&expt.options(policy(false, true), VERSION), expt.config())
        .expect("forced setup");
    assert_work_ready(&expt, &forced);
}

#[test]
fn missing_executable_is_reported() {
    let expt = TestExperiment::new().expect("experiment");
    fs::remove_file(expt.lab_path().join("bin").join(TEST_EXE)).expect("remove exe");

    let err = run_setup(&expt.options(policy(false, false), VERSION), expt.config()).unwrap_err();

    match err {
        SetupError::MissingInputFile { path } => assert!(path.ends_with(TEST_EXE)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(fs::symlink_metadata(expt.work_link()).is_err());
}

#[test]
fn version_gate_honours_config_yaml() {
    let mut expt = TestExperiment::new().expect("experiment");
    expt.write_config(
        "exe: test.exe\ninput: testtest\nlaboratory: ../lab\npayu_minimum_version: 1.1\n",
    )
    .expect("write config");

    let err = run_setup(&expt.options(policy(false, false), "1.0.9"), expt.config()).unwrap_err();
    assert!(matches!(err, SetupError::VersionTooLow { .. }), "{err}");
    assert!(fs::symlink_metadata(expt.work_link()).is_err());

    let work = run_setup(&expt.options(policy(false, false), "v1.1.5+2.gabc1234.dirty"), expt.config())
        .expect("setup with new enough version");
    assert_work_ready(&expt, &work);
}

#[test]
fn empty_minimum_version_is_rejected() {
    let mut expt = TestExperiment::new().expect("experiment");
    expt.write_config("exe: test.exe\ninput: testtest\npayu_minimum_version: ''\n")
        .expect("write config");

    let err = run_setup(&expt.options(policy(false, false), VERSION), expt.config()).unwrap_err();
    assert!(matches!(err, SetupError::InvalidMinimumVersion { .. }), "{err}");
}
