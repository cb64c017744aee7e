//! Staging plan: which files land in a work directory, and from where.
//!
//! Planning only reads the filesystem. Every source is resolved and checked
//! before any work directory is created, so a missing input never leaves a
//! half-built work directory behind.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::config::CONFIG_FILE;
use super::lab::Laboratory;
use crate::error::{Result, SetupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    Copy,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Absolute source path.
    pub source: PathBuf,
    /// Destination relative to the work directory.
    pub dest: PathBuf,
    pub mode: StageMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    /// Model config files followed by `config.yaml`, copied from control.
    pub config_files: Vec<StagedFile>,
    /// Input files linked from the laboratory.
    pub inputs: Vec<StagedFile>,
    /// Executable linked from `<lab>/bin`.
    pub executable: StagedFile,
}

impl StagingPlan {
    pub fn files(&self) -> impl Iterator<Item = &StagedFile> {
        self.config_files
            .iter()
            .chain(&self.inputs)
            .chain(std::iter::once(&self.executable))
    }
}

/// Resolve every file setup needs to stage.
pub fn plan_staging(
    control_dir: &Path,
    laboratory: &Laboratory,
    config_files: &[String],
    inputs: &[PathBuf],
    exe: &str,
) -> Result<StagingPlan> {
    let mut seen = HashSet::new();

    let mut staged_configs = Vec::with_capacity(config_files.len() + 1);
    let names = config_files
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(CONFIG_FILE));
    for name in names {
        let source = require_file(&control_dir.join(name))?;
        let dest = PathBuf::from(name);
        if seen.insert(dest.clone()) {
            staged_configs.push(StagedFile {
                source,
                dest,
                mode: StageMode::Copy,
            });
        }
    }

    let exe_source = require_file(&laboratory.bin_dir.join(exe))?;
    let exe_dest = exe_source
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| SetupError::missing(&exe_source))?;
    if !seen.insert(exe_dest.clone()) {
        return Err(SetupError::InvalidConfig {
            path: control_dir.join(CONFIG_FILE),
            message: format!(
                "executable {} would replace the staged config file of the same name",
                exe_dest.display()
            ),
        });
    }

    let mut staged_inputs = Vec::new();
    for entry in inputs {
        for file in expand_input(&laboratory.input_dir.join(entry))? {
            if seen.insert(file.dest.clone()) {
                staged_inputs.push(file);
            } else {
                warn!(
                    dest = %file.dest.display(),
                    source = %file.source.display(),
                    "input shadowed by an earlier staged file"
                );
            }
        }
    }

    debug!(
        config_files = staged_configs.len(),
        inputs = staged_inputs.len(),
        exe = %exe_source.display(),
        "staging plan resolved"
    );
    Ok(StagingPlan {
        config_files: staged_configs,
        inputs: staged_inputs,
        executable: StagedFile {
            source: exe_source,
            dest: exe_dest,
            mode: StageMode::Link,
        },
    })
}

/// A directory contributes every file beneath it, a file contributes itself.
fn expand_input(path: &Path) -> Result<Vec<StagedFile>> {
    let root = absolute(path)?;
    if !root.exists() {
        return Err(SetupError::missing(root));
    }
    if !root.is_dir() {
        let dest = root
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| SetupError::missing(&root))?;
        return Ok(vec![StagedFile {
            source: root,
            dest,
            mode: StageMode::Link,
        }]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(&root).to_path_buf();
            SetupError::fs("walk", path, err.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let dest = entry
            .path()
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(entry.file_name()));
        files.push(StagedFile {
            source: entry.path().to_path_buf(),
            dest,
            mode: StageMode::Link,
        });
    }
    Ok(files)
}

fn require_file(path: &Path) -> Result<PathBuf> {
    let path = absolute(path)?;
    if path.is_file() {
        Ok(path)
    } else {
        Err(SetupError::missing(path))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|err| SetupError::fs("resolve", path, err))
}

/// Place every planned file into `work`, replacing existing entries.
pub fn apply_staging(plan: &StagingPlan, work: &Path) -> Result<()> {
    for file in plan.files() {
        let dest = work.join(&file.dest);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| SetupError::fs("create directory", parent, err))?;
        }
        remove_entry(&dest)?;
        match file.mode {
            StageMode::Copy => {
                fs::copy(&file.source, &dest).map_err(|err| SetupError::fs("copy", &dest, err))?;
            }
            StageMode::Link => {
                std::os::unix::fs::symlink(&file.source, &dest)
                    .map_err(|err| SetupError::fs("symlink", &dest, err))?;
            }
        }
        debug!(dest = %dest.display(), mode = ?file.mode, "staged");
    }
    Ok(())
}

/// Remove whatever is at `path` without following a final symlink.
pub(crate) fn remove_entry(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(SetupError::fs("inspect", path, err)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|err| SetupError::fs("remove", path, err))
}
