//! Test-only fixtures: a laboratory plus control directory in a tempdir.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::policy::SetupPolicy;
use crate::io::config::{CONFIG_FILE, ExperimentConfig, parse_experiment_config};
use crate::io::lab::Laboratory;
use crate::models::Model;
use crate::setup::SetupOptions;

pub const TEST_EXE: &str = "test.exe";
pub const TEST_INPUT: &str = "testtest";
/// Input files `input_001.bin`..`input_003.bin`, `1000^2 + i` bytes each.
pub const INPUT_COUNT: u64 = 3;

pub const DEFAULT_CONFIG: &str = "\
model: test
exe: test.exe
input: testtest
laboratory: ../lab
";

/// Control directory `ctrl/` and laboratory `lab/` side by side in a tempdir.
pub struct TestExperiment {
    temp: TempDir,
    control_dir: PathBuf,
    lab_path: PathBuf,
    config: ExperimentConfig,
}

impl TestExperiment {
    /// Initialized lab with executable and inputs, plus a populated control dir.
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let control_dir = temp.path().join("ctrl");
        let lab_path = temp.path().join("lab");
        fs::create_dir_all(&control_dir).context("create control dir")?;

        let lab = Laboratory::initialize(&lab_path)?;
        make_sized_file(&lab.bin_dir.join(TEST_EXE), 4096)?;
        let input_dir = lab.input_dir.join(TEST_INPUT);
        fs::create_dir_all(&input_dir).context("create input dir")?;
        for i in 1..=INPUT_COUNT {
            make_sized_file(&input_dir.join(input_name(i)), input_size(i))?;
        }
        for name in Model::Test.config_files() {
            make_sized_file(&control_dir.join(name), 29)?;
        }

        let mut expt = Self {
            temp,
            control_dir,
            lab_path,
            config: ExperimentConfig::with_exe(TEST_EXE),
        };
        expt.write_config(DEFAULT_CONFIG)?;
        Ok(expt)
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn control_dir(&self) -> &Path {
        &self.control_dir
    }

    pub fn lab_path(&self) -> &Path {
        &self.lab_path
    }

    pub fn work_link(&self) -> PathBuf {
        self.control_dir.join("work")
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Replace `config.yaml` and the parsed copy used by [`Self::config`].
    pub fn write_config(&mut self, yaml: &str) -> Result<()> {
        let path = self.control_dir.join(CONFIG_FILE);
        fs::write(&path, yaml).with_context(|| format!("write {}", path.display()))?;
        self.config = parse_experiment_config(yaml, &path)?;
        Ok(())
    }

    pub fn options<'a>(&'a self, policy: SetupPolicy, tool_version: &'a str) -> SetupOptions<'a> {
        SetupOptions {
            control_dir: &self.control_dir,
            lab_path: Some(self.lab_path.as_path()),
            policy,
            tool_version,
        }
    }
}

pub fn input_name(i: u64) -> String {
    format!("input_{i:03}.bin")
}

pub fn input_size(i: u64) -> u64 {
    1000_u64.pow(2) + i
}

/// Create `path` as a zero-filled file of exactly `size` bytes.
pub fn make_sized_file(path: &Path, size: u64) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    file.set_len(size)
        .with_context(|| format!("size {}", path.display()))?;
    Ok(())
}
