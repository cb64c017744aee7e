//! Experiment configuration stored in `<control>/config.yaml`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use tracing::debug;

use crate::core::version::MinimumVersion;
use crate::error::{Result, SetupError};

pub const CONFIG_FILE: &str = "config.yaml";

/// The subset of `config.yaml` that setup consumes.
///
/// The file is written by humans; unknown keys are ignored so that configs
/// shared with other tooling still load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperimentConfig {
    /// Executable file name, resolved against `<lab>/bin`.
    pub exe: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Input directories or files, relative to `<lab>/input`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub input: Vec<PathBuf>,

    /// Laboratory root, used when no `--laboratory` flag is given.
    #[serde(default)]
    pub laboratory: Option<PathBuf>,

    /// Extra control-directory files staged on top of the model's list.
    #[serde(default)]
    pub config_files: Vec<String>,

    /// Kept raw: an absent key and an explicit `null` mean different things.
    #[serde(default, deserialize_with = "present")]
    pub payu_minimum_version: Option<Value>,
}

fn default_model() -> String {
    "test".to_string()
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(path)) => vec![path],
        Some(OneOrMany::Many(paths)) => paths,
        None => Vec::new(),
    })
}

impl ExperimentConfig {
    /// A config with only `exe` set and every other key at its default.
    pub fn with_exe(exe: impl Into<String>) -> Self {
        Self {
            exe: exe.into(),
            model: default_model(),
            input: Vec::new(),
            laboratory: None,
            config_files: Vec::new(),
            payu_minimum_version: None,
        }
    }

    /// The configured minimum tool version, if the key is present at all.
    pub fn minimum_version(&self) -> Option<MinimumVersion> {
        self.payu_minimum_version.as_ref().map(|value| match value {
            Value::String(s) => MinimumVersion::Text(s.clone()),
            Value::Number(n) => MinimumVersion::from_number(n),
            Value::Null => MinimumVersion::Null,
            Value::Bool(_) => MinimumVersion::Unsupported("bool"),
            Value::Sequence(_) => MinimumVersion::Unsupported("sequence"),
            Value::Mapping(_) => MinimumVersion::Unsupported("mapping"),
            Value::Tagged(_) => MinimumVersion::Unsupported("tagged value"),
        })
    }

    pub fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| SetupError::InvalidConfig {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if self.exe.trim().is_empty() {
            return Err(invalid("exe must be a non-empty file name"));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model must be non-empty"));
        }
        if self.config_files.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("config_files entries must be non-empty"));
        }
        if self.config_files.iter().any(|name| escapes_control_dir(name)) {
            return Err(invalid(
                "config_files entries must be relative paths inside the control directory",
            ));
        }
        Ok(())
    }
}

fn escapes_control_dir(name: &str) -> bool {
    Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Load and validate `<control_dir>/config.yaml`.
pub fn load_experiment_config(control_dir: &Path) -> Result<ExperimentConfig> {
    let path = control_dir.join(CONFIG_FILE);
    debug!(path = %path.display(), "loading experiment config");
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(SetupError::missing(path)),
        Err(err) => return Err(SetupError::fs("read", path, err)),
    };
    let cfg = parse_experiment_config(&contents, &path)?;
    debug!(exe = %cfg.exe, model = %cfg.model, inputs = cfg.input.len(), "experiment config loaded");
    Ok(cfg)
}

/// Parse config text; `path` is only used in error messages.
pub fn parse_experiment_config(contents: &str, path: &Path) -> Result<ExperimentConfig> {
    let cfg: ExperimentConfig =
        serde_yaml::from_str(contents).map_err(|err| SetupError::InvalidConfig {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    cfg.validate(path)?;
    Ok(cfg)
}
