//! Print command implementation.
//!
//! Runs the sampling loop without an HTTP server and prints every newly
//! published snapshot to stdout.

use herakles_host_exporter::{resolve_interval, CancellationToken, Sampler, Scheduler, SnapshotStore};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cli::PrintFormat;
use crate::config::Config;

/// Upper bound for how often the store is polled for a new snapshot.
const MAX_POLL: Duration = Duration::from_millis(50);

/// Samples `iterations` times and prints each snapshot.
pub fn command_print(
    iterations: usize,
    format: PrintFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = resolve_interval(config.interval_ms);
    let store = Arc::new(SnapshotStore::new());
    let scheduler = Scheduler::new(
        Sampler::from_proc(config.proc_root()),
        Arc::clone(&store),
        interval,
        CancellationToken::new(),
    );

    let poll = (interval / 10).min(MAX_POLL);
    let mut last_seen = 0;
    let mut printed = 0;

    scheduler.start()?;
    while printed < iterations {
        let snapshot = store.current();
        if snapshot.uptime_seconds == last_seen {
            if !scheduler.is_running() {
                scheduler.stop();
                return Err("Sampler stopped before producing a new snapshot".into());
            }
            thread::sleep(poll);
            continue;
        }
        last_seen = snapshot.uptime_seconds;
        printed += 1;

        match format {
            PrintFormat::Prometheus => {
                if printed > 1 {
                    println!();
                }
                print!("{}", snapshot.render_exposition());
            }
            PrintFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
        }
    }
    scheduler.stop();

    Ok(())
}
