//! Test support for the atlas engine: an in-memory fake driver that
//! records everything it executes, and a YAML-driven runner for diff
//! cases shared across dialect crates.

mod fake;
pub mod yaml_runner;

pub use fake::FakeDriver;
