//! Per-control-directory setup states.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentState {
    /// Laboratory layout is missing or incomplete.
    Uninitialized,
    /// Laboratory layout exists; the control directory has not been probed.
    LabReady,
    /// Laboratory ready, no usable work directory.
    WorkAbsent,
    /// `work` resolves to a directory.
    WorkReady,
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::LabReady => "lab_ready",
            Self::WorkAbsent => "work_absent",
            Self::WorkReady => "work_ready",
        };
        f.write_str(label)
    }
}
