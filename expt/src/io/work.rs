//! Work directory lifecycle: probe, sweep, create, populate, verify.
//!
//! The work directory is a real directory under `<lab>/work/`, reached from
//! the control directory through a `work` symlink. One writer per control
//! directory is assumed; nothing here takes a lock.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;
use tracing::{debug, info};

use super::lab::{Laboratory, ensure_dir};
use super::stage::{StagedFile, StagingPlan, apply_staging, plan_staging, remove_entry};
use crate::core::policy::{SetupAction, SetupPolicy, WorkState, decide};
use crate::error::{Result, SetupError};

pub const WORK_LINK: &str = "work";

/// Everything needed to bring one control directory's work directory up.
#[derive(Debug, Clone)]
pub struct WorkRequest<'a> {
    pub control_dir: &'a Path,
    pub laboratory: &'a Laboratory,
    pub policy: SetupPolicy,
    /// Model config files to copy from the control directory.
    pub config_files: &'a [String],
    /// Input entries, relative to `<lab>/input` or absolute.
    pub inputs: &'a [PathBuf],
    pub exe: &'a str,
    /// Prefix for the generated work directory name.
    pub name: &'a str,
}

/// A populated work directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkDirectory {
    /// `<control>/work`.
    pub link: PathBuf,
    /// Canonical directory the link resolves to.
    pub target: PathBuf,
    pub executable: PathBuf,
    pub config_files: Vec<PathBuf>,
    pub inputs: Vec<PathBuf>,
}

/// Inspect `<control_dir>/work` without changing anything.
pub fn probe_work(control_dir: &Path) -> Result<WorkState> {
    let link = control_dir.join(WORK_LINK);
    let meta = match fs::symlink_metadata(&link) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(WorkState::Absent),
        Err(err) => return Err(SetupError::fs("inspect", link, err)),
    };
    if !meta.file_type().is_symlink() {
        return Ok(WorkState::Unlinked { path: link });
    }
    match fs::canonicalize(&link) {
        Ok(target) if target.is_dir() => Ok(WorkState::Linked { link, target }),
        Ok(_) => Ok(WorkState::Unlinked { path: link }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(WorkState::Dangling { link }),
        Err(err) => Err(SetupError::fs("resolve", link, err)),
    }
}

/// Probe `work` and apply `policy` to it. Reads only.
pub fn check_policy(control_dir: &Path, policy: SetupPolicy) -> Result<(WorkState, SetupAction)> {
    let state = probe_work(control_dir)?;
    debug!(state = ?state, policy = ?policy, "probed work directory");
    let action = decide(&state, policy)?;
    Ok((state, action))
}

/// Bring the work directory into a fully staged state according to `policy`.
pub fn setup_work(request: &WorkRequest<'_>) -> Result<WorkDirectory> {
    let (state, action) = check_policy(request.control_dir, request.policy)?;

    let plan = plan_staging(
        request.control_dir,
        request.laboratory,
        request.config_files,
        request.inputs,
        request.exe,
    )?;

    let link = request.control_dir.join(WORK_LINK);
    let target = match action {
        SetupAction::Overwrite { target } => {
            info!(target = %target.display(), "overwriting existing work directory");
            target
        }
        SetupAction::SweepThenCreate => {
            remove_work(&state)?;
            create_work(&link, request.laboratory, request.name)?
        }
        SetupAction::CreateFresh => {
            if let WorkState::Dangling { link } = &state {
                debug!(link = %link.display(), "removing dangling work link");
                remove_entry(link)?;
            }
            create_work(&link, request.laboratory, request.name)?
        }
    };

    apply_staging(&plan, &target)?;
    let work = verify_work(&link, &plan, request.laboratory, request.exe)?;
    info!(
        link = %work.link.display(),
        target = %work.target.display(),
        inputs = work.inputs.len(),
        "work directory ready"
    );
    Ok(work)
}

/// Remove the work directory and its link. Returns whether anything existed.
pub fn sweep_work(control_dir: &Path) -> Result<bool> {
    let state = probe_work(control_dir)?;
    if state == WorkState::Absent {
        return Ok(false);
    }
    remove_work(&state)?;
    Ok(true)
}

fn remove_work(state: &WorkState) -> Result<()> {
    match state {
        WorkState::Absent => {}
        WorkState::Dangling { link } | WorkState::Unlinked { path: link } => {
            info!(path = %link.display(), "sweeping work path");
            remove_entry(link)?;
        }
        WorkState::Linked { link, target } => {
            info!(target = %target.display(), "sweeping work directory");
            fs::remove_dir_all(target).map_err(|err| SetupError::fs("remove", target, err))?;
            remove_entry(link)?;
        }
    }
    Ok(())
}

fn create_work(link: &Path, laboratory: &Laboratory, name: &str) -> Result<PathBuf> {
    ensure_dir(&laboratory.work_dir)?;
    let target = laboratory
        .work_dir
        .join(build_work_name(name, &generate_timestamp(), &generate_short_id()));
    fs::create_dir(&target).map_err(|err| SetupError::fs("create directory", &target, err))?;
    let target = fs::canonicalize(&target).map_err(|err| SetupError::fs("resolve", &target, err))?;
    std::os::unix::fs::symlink(&target, link).map_err(|err| SetupError::fs("symlink", link, err))?;
    debug!(link = %link.display(), target = %target.display(), "created work directory");
    Ok(target)
}

pub fn build_work_name(name: &str, timestamp: &str, short_id: &str) -> String {
    format!("{name}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

/// Check every post-condition of setup and describe the result.
fn verify_work(
    link: &Path,
    plan: &StagingPlan,
    laboratory: &Laboratory,
    exe: &str,
) -> Result<WorkDirectory> {
    let failed = |path: &Path, reason: &str| SetupError::VerificationFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let is_link = fs::symlink_metadata(link).is_ok_and(|meta| meta.file_type().is_symlink());
    if !is_link || !link.is_dir() {
        return Err(failed(link, "work link does not resolve to a directory"));
    }
    let target = fs::canonicalize(link).map_err(|err| SetupError::fs("resolve", link, err))?;

    let present = |file: &StagedFile| -> Result<PathBuf> {
        let path = link.join(&file.dest);
        if path.is_file() {
            Ok(path)
        } else {
            Err(failed(&path, "staged file is missing"))
        }
    };
    let config_files = plan.config_files.iter().map(&present).collect::<Result<Vec<_>>>()?;
    let inputs = plan.inputs.iter().map(&present).collect::<Result<Vec<_>>>()?;

    let executable = present(&plan.executable)?;
    let registered = laboratory.bin_dir.join(exe);
    let staged = fs::canonicalize(&executable)
        .map_err(|err| SetupError::fs("resolve", &executable, err))?;
    let expected = fs::canonicalize(&registered)
        .map_err(|err| SetupError::fs("resolve", &registered, err))?;
    if staged != expected {
        return Err(failed(&executable, "executable does not resolve to the laboratory binary"));
    }

    Ok(WorkDirectory {
        link: link.to_path_buf(),
        target,
        executable,
        config_files,
        inputs,
    })
}
