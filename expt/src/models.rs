//! Model drivers: which control-directory files each model needs staged.

use std::str::FromStr;

use crate::error::SetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Minimal model used for exercising setup end to end.
    Test,
}

impl Model {
    /// Config files the model reads from its work directory.
    pub fn config_files(self) -> &'static [&'static str] {
        match self {
            Self::Test => &["data", "diag", "input.nml"],
        }
    }
}

impl FromStr for Model {
    type Err = SetupError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            _ => Err(SetupError::UnknownModel(name.to_string())),
        }
    }
}

/// The model's own files followed by user extras, without duplicates.
pub fn config_file_list(model: Model, extra: &[String]) -> Vec<String> {
    let mut files: Vec<String> = model
        .config_files()
        .iter()
        .map(|name| name.to_string())
        .collect();
    for name in extra {
        if !files.contains(name) {
            files.push(name.clone());
        }
    }
    files
}
