//! Stable exit codes for expt CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration, version string, model, or other usage errors.
pub const INVALID: i32 = 1;
/// `expt setup` refused to touch an existing work directory.
pub const CONFLICT: i32 = 2;
/// Tool version is older than the configured `payu_minimum_version`.
pub const VERSION_TOO_LOW: i32 = 3;
/// A config, input, or executable source file is missing.
pub const MISSING_INPUT: i32 = 4;
/// Filesystem failure (permissions, I/O, broken post-conditions).
pub const FILESYSTEM: i32 = 5;
