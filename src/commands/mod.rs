//! CLI command implementations for herakles-host-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Counter source and configuration validation
//! - `config`: Configuration file generation
//! - `print`: Sampling without HTTP, printing each snapshot

pub mod check;
pub mod config;
pub mod print;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use print::command_print;
