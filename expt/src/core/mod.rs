//! Deterministic, pure logic shared by setup.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod policy;
pub mod state;
pub mod version;
