//! Relaxed semantic version parsing and the minimum-version gate.
//!
//! Accepted grammar: `[v|V]MAJOR[.MINOR[.PATCH]][+BUILD]`, where `BUILD` is
//! dot-separated metadata such as `4.gabc1234` that may end in a `dirty`
//! marker. Only `(major, minor, patch)` takes part in ordering.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SetupError;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\+([0-9A-Za-z][0-9A-Za-z.-]*))?$")
        .expect("version regex is valid")
});

const DIRTY_MARKER: &str = "dirty";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("version string is empty")]
    Empty,
    #[error("expected [v]MAJOR[.MINOR[.PATCH]][+BUILD]")]
    Malformed,
    #[error("version component '{0}' is out of range")]
    OutOfRange(String),
}

/// A parsed version. Equality and ordering ignore `build` and `dirty`.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Build metadata after `+`, without the trailing `dirty` marker.
    pub build: Option<String>,
    pub dirty: bool,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            build: None,
            dirty: false,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or(VersionParseError::Malformed)?;

        let component = |idx: usize| -> Result<u64, VersionParseError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| VersionParseError::OutOfRange(m.as_str().to_string())),
                None => Ok(0),
            }
        };

        let (build, dirty) = match caps.get(4) {
            Some(m) => split_dirty(m.as_str()),
            None => (None, false),
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            build,
            dirty,
        })
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn split_dirty(build: &str) -> (Option<String>, bool) {
    let (rest, dirty) = match build.strip_suffix(DIRTY_MARKER) {
        Some(rest) if rest.is_empty() => ("", true),
        Some(rest) if rest.ends_with('.') => (&rest[..rest.len() - 1], true),
        _ => (build, false),
    };
    let build = (!rest.is_empty()).then(|| rest.to_string());
    (build, dirty)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        match (&self.build, self.dirty) {
            (Some(build), true) => write!(f, "+{build}.{DIRTY_MARKER}"),
            (Some(build), false) => write!(f, "+{build}"),
            (None, true) => write!(f, "+{DIRTY_MARKER}"),
            (None, false) => Ok(()),
        }
    }
}

/// Compare two versions on `(major, minor, patch)`.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

/// A minimum version exactly as it appeared in run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinimumVersion {
    Text(String),
    /// A numeric YAML value, already stringified (`1.1` becomes `"1.1"`).
    Number(String),
    /// The key was present with an explicit null.
    Null,
    /// The key held a value of some other YAML type.
    Unsupported(&'static str),
}

impl MinimumVersion {
    pub fn from_number(value: impl fmt::Display) -> Self {
        Self::Number(value.to_string())
    }

    fn raw(&self) -> String {
        match self {
            Self::Text(s) | Self::Number(s) => s.clone(),
            Self::Null => "null".to_string(),
            Self::Unsupported(kind) => format!("<{kind}>"),
        }
    }

    pub fn parse(&self) -> Result<Version, SetupError> {
        let invalid = |reason: String| SetupError::InvalidMinimumVersion {
            raw: self.raw(),
            reason,
        };
        match self {
            Self::Text(s) | Self::Number(s) => {
                Version::parse(s).map_err(|err| invalid(err.to_string()))
            }
            Self::Null => Err(invalid("value is null".to_string())),
            Self::Unsupported(kind) => Err(invalid(format!("expected a string or number, got {kind}"))),
        }
    }
}

/// Whether `current` meets `minimum`. An absent minimum is no constraint.
pub fn satisfies_minimum(
    current: &str,
    minimum: Option<&MinimumVersion>,
) -> Result<bool, SetupError> {
    let Some(minimum) = minimum else {
        return Ok(true);
    };
    let current = Version::parse(current).map_err(|source| SetupError::InvalidVersion {
        raw: current.to_string(),
        source,
    })?;
    let minimum = minimum.parse()?;
    Ok(compare(&current, &minimum) != Ordering::Less)
}

/// Like [`satisfies_minimum`], but a failed check is `VersionTooLow`.
pub fn check_minimum_version(
    current: &str,
    minimum: Option<&MinimumVersion>,
) -> Result<(), SetupError> {
    if satisfies_minimum(current, minimum)? {
        return Ok(());
    }
    let minimum = minimum.map(MinimumVersion::raw).unwrap_or_default();
    Err(SetupError::VersionTooLow {
        current: current.to_string(),
        minimum,
    })
}
