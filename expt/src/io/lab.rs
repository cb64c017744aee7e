//! Laboratory layout: the shared root for binaries, inputs, and archives.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SetupError};

/// All canonical paths within a laboratory root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Laboratory {
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    pub input_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub codebase_dir: PathBuf,
    /// Parent of per-run work directories. Created by setup, not by init.
    pub work_dir: PathBuf,
}

impl Laboratory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            bin_dir: root.join("bin"),
            input_dir: root.join("input"),
            archive_dir: root.join("archive"),
            codebase_dir: root.join("codebase"),
            work_dir: root.join("work"),
            root,
        }
    }

    /// Create the laboratory root and its fixed subdirectories.
    ///
    /// Idempotent: existing directories and their contents are left alone.
    pub fn initialize(root: impl Into<PathBuf>) -> Result<Self> {
        let lab = Self::new(root);
        debug!(root = %lab.root.display(), "initializing laboratory");
        // The root itself may be reached through a symlink, the fixed
        // subdirectories may not.
        if !lab.root.is_dir() {
            ensure_dir(&lab.root)?;
        }
        for dir in lab.fixed_dirs() {
            ensure_dir(dir)?;
        }
        Ok(lab)
    }

    /// Whether every fixed subdirectory exists as a real directory.
    pub fn is_initialized(&self) -> bool {
        self.fixed_dirs().iter().all(|dir| is_real_dir(dir))
    }

    fn fixed_dirs(&self) -> [&Path; 4] {
        [
            self.bin_dir.as_path(),
            self.input_dir.as_path(),
            self.archive_dir.as_path(),
            self.codebase_dir.as_path(),
        ]
    }
}

/// Create `path` unless it is already a real directory.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(SetupError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(SetupError::fs("inspect", path, err)),
    }
    fs::create_dir_all(path).map_err(|err| SetupError::fs("create directory", path, err))
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}
