//! Error taxonomy for laboratory and work directory setup.
//!
//! Every failure the library can detect has its own variant so the CLI can
//! map it to a stable exit code. Nothing in the library swallows these; the
//! orchestrator propagates them unchanged.

use std::io;
use std::path::PathBuf;

use crate::core::version::VersionParseError;
use crate::exit_codes;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The running tool reported a version string that does not parse.
    #[error("invalid tool version '{raw}': {source}")]
    InvalidVersion {
        raw: String,
        #[source]
        source: VersionParseError,
    },

    /// The configured `payu_minimum_version` does not parse.
    #[error("invalid payu_minimum_version '{raw}' in config: {reason}")]
    InvalidMinimumVersion { raw: String, reason: String },

    #[error("tool version {current} is older than the configured minimum {minimum}")]
    VersionTooLow { current: String, minimum: String },

    #[error("work path already exists: {path} ({hint})")]
    SetupConflict { path: PathBuf, hint: &'static str },

    #[error("missing input file: {path}")]
    MissingInputFile { path: PathBuf },

    #[error("{action} {path}: {source}")]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} exists but is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("invalid config {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("work directory check failed for {path}: {reason}")]
    VerificationFailed { path: PathBuf, reason: String },
}

impl SetupError {
    /// Wrap an I/O error with the action and path that produced it.
    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::MissingInputFile { path: path.into() }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidVersion { .. }
            | Self::InvalidMinimumVersion { .. }
            | Self::InvalidConfig { .. }
            | Self::UnknownModel(_) => exit_codes::INVALID,
            Self::VersionTooLow { .. } => exit_codes::VERSION_TOO_LOW,
            Self::SetupConflict { .. } => exit_codes::CONFLICT,
            Self::MissingInputFile { .. } => exit_codes::MISSING_INPUT,
            Self::Filesystem { .. }
            | Self::NotADirectory { .. }
            | Self::VerificationFailed { .. } => exit_codes::FILESYSTEM,
        }
    }
}

pub type Result<T, E = SetupError> = std::result::Result<T, E>;
