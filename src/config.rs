//! Configuration management for herakles-host-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use herakles_host_exporter::{DEFAULT_INTERVAL_MS, DEFAULT_PROC_ROOT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Default config file locations, searched in order.
const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/herakles/host-exporter.yaml",
    "/etc/herakles/host-exporter.yml",
    "/etc/herakles/host-exporter.json",
    "./herakles-host-exporter.yaml",
    "./herakles-host-exporter.yml",
    "./herakles-host-exporter.json",
];

/// Errors found while validating the effective configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("TLS is enabled but neither tls_cert_path nor tls_key_path are set")]
    TlsPathsMissing,

    #[error("TLS is enabled but tls_key_path is not set")]
    TlsKeyMissing,

    #[error("TLS is enabled but tls_cert_path is not set")]
    TlsCertMissing,

    #[error("TLS {kind} file not found: {path}")]
    TlsFileNotFound { kind: &'static str, path: String },

    #[error("TLS {kind} file is empty: {path}")]
    TlsFileEmpty { kind: &'static str, path: String },

    #[error("TLS {kind} file is not readable: {path} ({reason})")]
    TlsFileUnreadable {
        kind: &'static str,
        path: String,
        reason: String,
    },
}

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    #[serde(alias = "interval-ms")]
    pub interval_ms: Option<u64>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Feature flags
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<LogLevel>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            interval_ms: Some(DEFAULT_INTERVAL_MS),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            enable_telemetry: Some(false),
            log_level: Some(LogLevel::Info),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Effective log level, falling back to `info`.
    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or(LogLevel::Info)
    }

    /// Effective proc root, falling back to the default mount point.
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }
}

/// Checks one TLS material file for existence and content.
fn validate_tls_file(kind: &'static str, path: &str) -> Result<(), ConfigError> {
    let file = Path::new(path);
    if !file.exists() {
        return Err(ConfigError::TlsFileNotFound {
            kind,
            path: path.to_string(),
        });
    }

    match fs::metadata(file) {
        Ok(meta) if meta.len() == 0 => Err(ConfigError::TlsFileEmpty {
            kind,
            path: path.to_string(),
        }),
        Err(e) => Err(ConfigError::TlsFileUnreadable {
            kind,
            path: path.to_string(),
            reason: e.to_string(),
        }),
        Ok(_) => Ok(()),
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.port == Some(0) {
        return Err(ConfigError::InvalidPort);
    }

    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => return Err(ConfigError::TlsPathsMissing),
            (Some(_), None) => return Err(ConfigError::TlsKeyMissing),
            (None, Some(_)) => return Err(ConfigError::TlsCertMissing),
            (Some(cert), Some(key)) => {
                validate_tls_file("certificate", cert)?;
                validate_tls_file("private key", key)?;
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI/env (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = Some(interval_ms);
    }
    if let Some(proc_root) = &args.proc_root {
        config.proc_root = Some(proc_root.clone());
    }
    if let Some(log_level) = args.log_level {
        config.log_level = Some(log_level);
    }

    // Feature flags
    if args.enable_telemetry {
        config.enable_telemetry = Some(true);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Config file that `resolve_config` reads for `args`, if any.
pub fn config_source(args: &Args) -> Option<PathBuf> {
    if args.no_config {
        return None;
    }
    match &args.config {
        Some(p) => Some(p.clone()),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists()),
    }
}

/// Configuration loading with multiple format support.
///
/// Without an explicit path the default locations are searched; if none exists
/// the built-in defaults are returned.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;
    parse_config(&path, &content)
}

/// Parses config file content, choosing the format from the file extension.
fn parse_config(path: &Path, content: &str) -> Result<Config, Box<dyn std::error::Error>> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => Ok(serde_json::from_str(content)?),
        Some("toml") => Ok(toml::from_str(content)?),
        // Default to YAML
        _ => Ok(serde_yaml::from_str(content)?),
    }
}

/// Serializes configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate_effective_config(&config).is_ok());
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.interval_ms, Some(1000));
        assert_eq!(config.proc_root(), PathBuf::from("/proc"));
    }

    #[test]
    fn test_zero_port_is_invalid() {
        let config = Config {
            port: Some(0),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&config),
            Err(ConfigError::InvalidPort)
        ));
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let config = Config {
            enable_tls: Some(true),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&config),
            Err(ConfigError::TlsPathsMissing)
        ));

        let config = Config {
            enable_tls: Some(true),
            tls_cert_path: Some("/nonexistent/cert.pem".into()),
            tls_key_path: Some("/nonexistent/key.pem".into()),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&config),
            Err(ConfigError::TlsFileNotFound { kind: "certificate", .. })
        ));
    }

    #[test]
    fn test_tls_rejects_empty_files() {
        let cert = tempfile::NamedTempFile::new().unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(b"key").unwrap();

        let config = Config {
            enable_tls: Some(true),
            tls_cert_path: Some(cert.path().to_string_lossy().to_string()),
            tls_key_path: Some(key.path().to_string_lossy().to_string()),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&config),
            Err(ConfigError::TlsFileEmpty { kind: "certificate", .. })
        ));
    }

    #[test]
    fn test_parse_config_formats() {
        let yaml = parse_config(Path::new("c.yaml"), "port: 9100\ninterval_ms: 250\n").unwrap();
        assert_eq!(yaml.port, Some(9100));
        assert_eq!(yaml.interval_ms, Some(250));

        let json = parse_config(Path::new("c.json"), r#"{"port": 9101, "enable_tls": false}"#)
            .unwrap();
        assert_eq!(json.port, Some(9101));

        let toml = parse_config(Path::new("c.toml"), "port = 9102\nproc_root = \"/host/proc\"\n")
            .unwrap();
        assert_eq!(toml.port, Some(9102));
        assert_eq!(toml.proc_root(), PathBuf::from("/host/proc"));
    }

    #[test]
    fn test_parse_config_accepts_dashed_aliases() {
        let yaml = parse_config(Path::new("c.yml"), "interval-ms: 500\nenable-telemetry: true\n")
            .unwrap();
        assert_eq!(yaml.interval_ms, Some(500));
        assert_eq!(yaml.enable_telemetry, Some(true));
    }

    #[test]
    fn test_log_level_from_file_and_cli() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"log_level: warn\n").unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::parse_from(["herakles-host-exporter", "--config", path]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.log_level(), LogLevel::Warn);
        assert_eq!(config_source(&args).as_deref(), Some(file.path()));

        let args = Args::parse_from([
            "herakles-host-exporter",
            "--config",
            path,
            "--log-level",
            "error",
        ]);
        assert_eq!(resolve_config(&args).unwrap().log_level(), LogLevel::Error);
    }

    #[test]
    fn test_log_level_defaults_to_info() {
        let args = Args::parse_from(["herakles-host-exporter", "--no-config"]);
        assert_eq!(resolve_config(&args).unwrap().log_level(), LogLevel::Info);
        assert_eq!(config_source(&args), None);

        let partial = parse_config(Path::new("c.yaml"), "port: 9100\n").unwrap();
        assert_eq!(partial.log_level, None);
        assert_eq!(partial.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_parse_config_log_level_names() {
        let yaml = parse_config(Path::new("c.yaml"), "log_level: debug\n").unwrap();
        assert_eq!(yaml.log_level, Some(LogLevel::Debug));
        let json = parse_config(Path::new("c.json"), r#"{"log-level": "off"}"#).unwrap();
        assert_eq!(json.log_level, Some(LogLevel::Off));
        assert!(parse_config(Path::new("c.yaml"), "log_level: loud\n").is_err());
    }

    #[test]
    fn test_load_config_missing_explicit_path() {
        assert!(load_config(Some(Path::new("/nonexistent/exporter.yaml"))).is_err());
    }

    #[test]
    fn test_render_config_round_trips_defaults() {
        let rendered = render_config(&Config::default(), &ConfigFormat::Yaml).unwrap();
        let parsed = parse_config(Path::new("c.yaml"), &rendered).unwrap();
        assert_eq!(parsed.port, Some(DEFAULT_PORT));
        assert_eq!(parsed.interval_ms, Some(DEFAULT_INTERVAL_MS));
    }
}
