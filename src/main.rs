//! herakles-host-exporter - version 0.1.0
//!
//! Host CPU/memory utilization exporter with tracing logging.
//! This is the main entry point that initializes the sampler and HTTP server and
//! handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use herakles_host_exporter::{
    resolve_interval, CancellationToken, CollectorTelemetry, Sampler, Scheduler, SnapshotStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_print};
use config::{
    config_source, resolve_config, show_config, validate_effective_config, Config,
    DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{healthz_handler, metrics_handler, not_found_handler};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let log_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(log_level) = log_level else {
        return;
    };

    // stderr keeps stdout clean for the print subcommand
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Initializes logging from the resolved config and reports where it came from.
fn start_logging(args: &Args, config: &Config) {
    setup_logging(config.log_level());
    match config_source(args) {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file loaded, using defaults and CLI arguments"),
    }
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Builds the HTTP router.
fn build_router(state: SharedState) -> Router {
    Router::new()
        // get() also answers HEAD unless a HEAD route is set explicitly
        .route(
            "/metrics",
            get(metrics_handler)
                .head(not_found_handler)
                .fallback(not_found_handler),
        )
        .route(
            "/healthz",
            get(healthz_handler)
                .head(not_found_handler)
                .fallback(not_found_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Check => command_check(&config),
            Commands::Print { iterations, format } => {
                start_logging(&args, &config);
                command_print(*iterations, format.clone(), &config)
            }
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    start_logging(&args, &config);

    info!(
        "Starting herakles-host-exporter {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_BUILD_TIMESTAMP")
    );

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let interval = resolve_interval(config.interval_ms);
    let proc_root = config.proc_root();

    info!(
        "Sampling {} every {}ms",
        proc_root.display(),
        interval.as_millis()
    );

    let telemetry = if config.enable_telemetry.unwrap_or(false) {
        Some(CollectorTelemetry::new()?)
    } else {
        None
    };

    // Start the sampling loop before serving so the first scrape has data
    let store = Arc::new(SnapshotStore::new());
    let shutdown = CancellationToken::new();
    let mut scheduler = Scheduler::new(
        Sampler::from_proc(&proc_root),
        Arc::clone(&store),
        interval,
        shutdown.clone(),
    );
    if let Some(telemetry) = &telemetry {
        scheduler = scheduler.with_telemetry(telemetry.clone());
    }
    scheduler.start()?;

    let state = Arc::new(AppState { store, telemetry });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let serve_result: Result<(), Box<dyn std::error::Error>> =
        if config.enable_tls.unwrap_or(false) {
            // These paths are guaranteed to exist since validate_effective_config() was called earlier
            let cert_path = config
                .tls_cert_path
                .as_ref()
                .expect("tls_cert_path should be set when enable_tls is true (validated at startup)");
            let key_path = config
                .tls_key_path
                .as_ref()
                .expect("tls_key_path should be set when enable_tls is true (validated at startup)");

            info!("Loading TLS certificate from: {}", cert_path);
            info!("Loading TLS private key from: {}", key_path);

            match RustlsConfig::from_pem_file(cert_path, key_path).await {
                Ok(tls_config) => {
                    info!(
                        "herakles-host-exporter listening on https://{}:{}",
                        bind_ip_str, port
                    );
                    let server =
                        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

                    tokio::select! {
                        result = server => result.map_err(Into::into),
                        _ = shutdown_signal() => Ok(()),
                    }
                }
                Err(e) => {
                    error!("Failed to load TLS configuration: {}", e);
                    Err(e.into())
                }
            }
        } else {
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    info!(
                        "herakles-host-exporter listening on http://{}:{}",
                        bind_ip_str, port
                    );
                    axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown_signal())
                        .await
                        .map_err(Into::into)
                }
                Err(e) => {
                    error!("Failed to bind {}: {}", addr, e);
                    Err(e.into())
                }
            }
        };

    // Signal the sampler, then wait for its last tick to finish
    shutdown.cancel();
    tokio::task::block_in_place(|| scheduler.stop());

    if let Err(e) = &serve_result {
        error!("Server error: {}", e);
    }
    serve_result?;

    info!("herakles-host-exporter stopped gracefully");
    Ok(())
}
