//! Background sampling loop.
//!
//! A [`Scheduler`] owns one dedicated thread that calls [`Sampler::tick`] and
//! publishes the result to the [`SnapshotStore`] at a fixed interval. The loop is
//! stopped cooperatively through a [`CancellationToken`]: the interval wait is
//! interrupted immediately, an in-flight tick always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::sampler::{CounterSource, Sampler};
use crate::snapshot::SnapshotStore;
use crate::telemetry::CollectorTelemetry;

pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Resolves a configured interval, falling back to the default when it is
/// unset or outside `MIN_INTERVAL_MS..=MAX_INTERVAL_MS`.
pub fn resolve_interval(interval_ms: Option<u64>) -> Duration {
    match interval_ms {
        Some(ms) if (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&ms) => Duration::from_millis(ms),
        Some(ms) => {
            warn!(
                "Sampling interval {}ms outside {}..={}ms, using default {}ms",
                ms, MIN_INTERVAL_MS, MAX_INTERVAL_MS, DEFAULT_INTERVAL_MS
            );
            Duration::from_millis(DEFAULT_INTERVAL_MS)
        }
        None => Duration::from_millis(DEFAULT_INTERVAL_MS),
    }
}

#[derive(Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    changed: Condvar,
}

/// Cloneable stop signal shared between the sampling loop and whoever owns
/// process shutdown.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    pub fn cancel(&self) {
        let mut cancelled = self.lock();
        *cancelled = true;
        self.state.changed.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Waits up to `timeout` for cancellation. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .state
            .changed
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn reset(&self) {
        *self.lock() = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives a [`Sampler`] on a dedicated thread.
pub struct Scheduler<S: CounterSource + 'static> {
    sampler: Arc<Mutex<Sampler<S>>>,
    store: Arc<SnapshotStore>,
    telemetry: Option<CollectorTelemetry>,
    interval: Duration,
    token: CancellationToken,
    running: AtomicBool,
    // Serializes start/stop and holds the active worker.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: CounterSource + 'static> Scheduler<S> {
    pub fn new(
        sampler: Sampler<S>,
        store: Arc<SnapshotStore>,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            sampler: Arc::new(Mutex::new(sampler)),
            store,
            telemetry: None,
            interval,
            token,
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Records every tick into `telemetry`.
    pub fn with_telemetry(mut self, telemetry: CollectorTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True while a sampling thread is alive and has not been cancelled.
    ///
    /// A worker that exited on its own (for example after a panic) reports
    /// `false` even before `stop()` reaps it.
    pub fn is_running(&self) -> bool {
        if !self.running.load(Ordering::Acquire) || self.token.is_cancelled() {
            return false;
        }
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        worker_alive(worker.as_ref())
    }

    /// Starts the sampling thread. No-op while already running.
    ///
    /// If the token was cancelled from outside since the last start, or the
    /// worker died, the old worker is reaped and the token is re-armed.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        if self.running.swap(true, Ordering::AcqRel) {
            if !self.token.is_cancelled() && worker_alive(worker.as_ref()) {
                debug!("Sampler already running, start ignored");
                return Ok(());
            }
            join_worker(worker.take());
        }

        self.token.reset();

        let sampler = Arc::clone(&self.sampler);
        let store = Arc::clone(&self.store);
        let telemetry = self.telemetry.clone();
        let token = self.token.clone();
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("sampler".into())
            .spawn(move || run_loop(&sampler, &store, telemetry.as_ref(), &token, interval));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!("Sampler started with interval {}ms", interval.as_millis());
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                error!("Failed to spawn sampler thread: {}", e);
                Err(e)
            }
        }
    }

    /// Stops the sampling thread and waits for it to exit. No-op when stopped.
    pub fn stop(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        self.token.cancel();
        join_worker(worker.take());
        info!("Sampler stopped");
    }
}

impl<S: CounterSource + 'static> Drop for Scheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_alive(handle: Option<&JoinHandle<()>>) -> bool {
    handle.is_some_and(|h| !h.is_finished())
}

fn join_worker(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if handle.join().is_err() {
            error!("Sampler thread panicked");
        }
    }
}

fn run_loop<S: CounterSource>(
    sampler: &Mutex<Sampler<S>>,
    store: &SnapshotStore,
    telemetry: Option<&CollectorTelemetry>,
    token: &CancellationToken,
    interval: Duration,
) {
    while !token.is_cancelled() {
        let start = Instant::now();
        let snapshot = sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tick();
        store.publish(snapshot);

        if let Some(telemetry) = telemetry {
            telemetry.record_tick(&snapshot, start.elapsed().as_secs_f64());
        }

        if token.wait_timeout(interval) {
            break;
        }
    }
    debug!("Sampler loop exited");
}
