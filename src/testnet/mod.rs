//! Shared fixtures for the unit tests
//!
//! Builders for signed transfers, linked blocks and ready-made chains, plus a
//! telemetry sink that records what the chain reported.

pub mod test_utils;

pub use test_utils::*;
