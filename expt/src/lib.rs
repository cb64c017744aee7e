//! Experiment laboratory and work directory setup.
//!
//! Prepares the directory a model run executes in, and refuses to do so when
//! the running tool is older than the run's configured minimum version. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (version parsing, the
//!   sweep/force decision table, setup states). No I/O.
//! - **[`io`]**: Side-effecting operations (laboratory layout, config
//!   loading, staging, the work directory lifecycle).
//!
//! [`setup`] coordinates the two to implement the CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod models;
pub mod setup;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
