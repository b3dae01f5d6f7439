//! CLI arguments and subcommands for herakles-host-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing and config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for the print subcommand
#[derive(Debug, Clone, ValueEnum)]
pub enum PrintFormat {
    Prometheus,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-host-exporter",
    about = "Prometheus exporter for host CPU and memory utilization",
    long_about = "Prometheus exporter for host CPU and memory utilization.\n\n\
                  Samples /proc/stat and /proc/meminfo at a fixed interval in the background \
                  and serves the latest sample on /metrics, with a /healthz liveness probe.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-host-exporter — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long, env = "PORT")]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Sampling interval in milliseconds (100-60000)
    #[arg(short = 'i', long, env = "INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Root of the proc filesystem to sample
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log level [default: info]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Append collector_* self-telemetry to /metrics
    #[arg(long)]
    pub enable_telemetry: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and counter sources
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Sample without serving HTTP and print each snapshot to stdout
    Print {
        /// Number of snapshots to print
        #[arg(short = 'n', long, default_value_t = 3)]
        iterations: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "prometheus")]
        format: PrintFormat,
    },
}
