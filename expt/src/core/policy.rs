//! Existence/sweep/force decision table for work directory setup.
//!
//! `decide` runs before anything on disk is touched, so a refused setup is
//! guaranteed to leave the control directory and laboratory unchanged.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SetupError;

/// How to treat a work directory that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetupPolicy {
    /// Remove any existing work directory before setup.
    pub sweep: bool,
    /// Re-stage into an existing work directory without removing it.
    pub force: bool,
}

/// What a probe of `<control>/work` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkState {
    Absent,
    /// `work` is a symlink whose target no longer exists.
    Dangling { link: PathBuf },
    /// `work` is a symlink resolving to a directory.
    Linked { link: PathBuf, target: PathBuf },
    /// `work` exists but is not a symlink (or resolves to a non-directory).
    Unlinked { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupAction {
    CreateFresh,
    /// Reuse the existing target and re-stage every file into it.
    Overwrite { target: PathBuf },
    SweepThenCreate,
}

const CONFLICT_HINT: &str = "use --sweep to remove it or --force to overwrite";
const UNLINKED_HINT: &str = "not a work symlink; use --sweep to remove it";

/// Apply the setup policy to the probed work state.
///
/// | existing | sweep | force | action          |
/// |----------|-------|-------|-----------------|
/// | absent   | any   | any   | create fresh    |
/// | present  | false | false | conflict        |
/// | present  | false | true  | overwrite       |
/// | present  | true  | any   | sweep, create   |
pub fn decide(state: &WorkState, policy: SetupPolicy) -> Result<SetupAction, SetupError> {
    match state {
        WorkState::Absent | WorkState::Dangling { .. } => Ok(SetupAction::CreateFresh),
        _ if policy.sweep => Ok(SetupAction::SweepThenCreate),
        WorkState::Linked { link, .. } if !policy.force => Err(conflict(link, CONFLICT_HINT)),
        WorkState::Linked { target, .. } => Ok(SetupAction::Overwrite {
            target: target.clone(),
        }),
        WorkState::Unlinked { path } if policy.force => Err(conflict(path, UNLINKED_HINT)),
        WorkState::Unlinked { path } => Err(conflict(path, CONFLICT_HINT)),
    }
}

fn conflict(path: &Path, hint: &'static str) -> SetupError {
    SetupError::SetupConflict {
        path: path.to_path_buf(),
        hint,
    }
}
