//! Command-line interface
//!
//! This module contains the CLI commands and argument parsing
//! for the node binary, plus the display forms `printchain` uses.

pub mod commands;

pub use commands::{BlockSummary, Command, Opt, TransactionSummary};
