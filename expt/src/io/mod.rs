//! Side-effecting operations: laboratory layout, config loading, staging,
//! and the work directory lifecycle.

pub mod config;
pub mod lab;
pub mod stage;
pub mod work;
