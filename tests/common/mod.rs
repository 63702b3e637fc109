//! Common test utilities for reel-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
