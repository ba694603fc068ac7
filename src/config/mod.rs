//! Configuration management
//!
//! Node settings come from an optional TOML file with `SKYNET_*` environment
//! overrides. The loaded [`Config`] is passed down explicitly.

pub mod settings;

pub use settings::{Config, MiningSettings, NodeSettings};
