//! Orchestration for `expt init`, `expt setup`, `expt sweep`, `expt status`.
//!
//! Setup walks one control directory through
//! `Uninitialized -> LabReady -> WorkAbsent -> WorkReady`. The version gate
//! runs first, before the laboratory or work directory is touched, so a
//! version mismatch never leaves anything half built.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::policy::{SetupPolicy, WorkState};
use crate::core::state::ExperimentState;
use crate::core::version::check_minimum_version;
use crate::error::{Result, SetupError};
use crate::io::config::{CONFIG_FILE, ExperimentConfig};
use crate::io::lab::Laboratory;
use crate::io::work::{
    WorkDirectory, WorkRequest, check_policy, probe_work, setup_work, sweep_work,
};
use crate::models::{Model, config_file_list};

/// Inputs to [`run_setup`] that do not come from `config.yaml`.
#[derive(Debug, Clone)]
pub struct SetupOptions<'a> {
    pub control_dir: &'a Path,
    /// `--laboratory`; falls back to the config's `laboratory` key.
    pub lab_path: Option<&'a Path>,
    pub policy: SetupPolicy,
    /// Version of the running tool, compared against `payu_minimum_version`.
    pub tool_version: &'a str,
}

/// Pick the laboratory root: explicit flag first, then config.
///
/// A relative `laboratory` in config is taken relative to the control dir.
pub fn resolve_lab_path(
    flag: Option<&Path>,
    config: &ExperimentConfig,
    control_dir: &Path,
) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    match &config.laboratory {
        Some(path) => Ok(control_dir.join(path)),
        None => Err(SetupError::InvalidConfig {
            path: control_dir.join(CONFIG_FILE),
            message: "no laboratory configured (set `laboratory` or pass --laboratory)"
                .to_string(),
        }),
    }
}

/// Create the laboratory skeleton at `lab_path`.
pub fn run_init(lab_path: &Path) -> Result<Laboratory> {
    let lab = Laboratory::initialize(lab_path)?;
    info!(root = %lab.root.display(), "laboratory initialized");
    Ok(lab)
}

/// Gate on the tool version and the sweep/force policy, then prepare the
/// work directory.
pub fn run_setup(options: &SetupOptions<'_>, config: &ExperimentConfig) -> Result<WorkDirectory> {
    let minimum = config.minimum_version();
    check_minimum_version(options.tool_version, minimum.as_ref())?;
    debug!(version = options.tool_version, minimum = ?minimum, "version gate passed");

    let model: Model = config.model.parse()?;
    let config_files = config_file_list(model, &config.config_files);

    let lab_path = resolve_lab_path(options.lab_path, config, options.control_dir)?;
    // A refused setup must not create the laboratory either.
    check_policy(options.control_dir, options.policy)?;
    let laboratory = Laboratory::initialize(&lab_path)?;
    debug!(state = %ExperimentState::LabReady, root = %laboratory.root.display());

    let name = experiment_name(options.control_dir);
    let work = setup_work(&WorkRequest {
        control_dir: options.control_dir,
        laboratory: &laboratory,
        policy: options.policy,
        config_files: &config_files,
        inputs: &config.input,
        exe: &config.exe,
        name: &name,
    })?;
    debug!(state = %ExperimentState::WorkReady, target = %work.target.display());
    Ok(work)
}

/// Remove the control directory's work directory, if any.
pub fn run_sweep(control_dir: &Path) -> Result<bool> {
    let removed = sweep_work(control_dir)?;
    if removed {
        info!(control = %control_dir.display(), "work directory removed");
    } else {
        info!(control = %control_dir.display(), "no work directory to remove");
    }
    Ok(removed)
}

/// Where the control directory currently sits in the setup lifecycle.
pub fn experiment_status(control_dir: &Path, lab_path: &Path) -> Result<ExperimentState> {
    if !Laboratory::new(lab_path).is_initialized() {
        return Ok(ExperimentState::Uninitialized);
    }
    let state = match probe_work(control_dir)? {
        WorkState::Linked { .. } => ExperimentState::WorkReady,
        WorkState::Absent | WorkState::Dangling { .. } | WorkState::Unlinked { .. } => {
            ExperimentState::WorkAbsent
        }
    };
    Ok(state)
}

fn experiment_name(control_dir: &Path) -> String {
    let canonical = std::fs::canonicalize(control_dir).unwrap_or_else(|_| control_dir.to_path_buf());
    canonical
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("expt")
        .to_string()
}
