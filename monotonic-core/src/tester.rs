use crate::{
    ClockId, Error, Journal, Level, Result, Snapshot, Stats, TesterConfig, WaitBackend, Waiter,
    clock::as_nanos,
    measure::{Measurement, Millis},
    wait,
};
use core::sync::atomic::{AtomicBool, Ordering};
use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};
use tracing::{debug, error};

struct Shared {
    config: TesterConfig,
    journal: Journal,
    keep_running: AtomicBool,
    stats: Mutex<Stats>,
    waiter: Option<Box<dyn Waiter>>,
}

impl Shared {
    fn keep_running(&self) -> bool {
        self.keep_running.load(Ordering::Acquire)
    }

    fn stats(&self) -> Stats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_stats<T>(&self, f: impl FnOnce(&mut Stats) -> T) -> T {
        f(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Two background workers that keep blocking for a known time and log how
/// long each clock says they were gone.
///
/// The `ticker` sleeps for `tick_period`; the `waiter` blocks on a condition
/// variable bound to `wait_clock` for `wait_timeout`. Dropping the tester
/// stops both.
pub struct Tester {
    final_stats: Option<Stats>,
    shared: Arc<Shared>,
    ticker: Option<JoinHandle<()>>,
    waiter: Option<JoinHandle<()>>,
}

impl Tester {
    /// Opens a new log file in `folder` and starts the workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the log file cannot be
    /// created or a thread cannot be spawned. A waiter that cannot be set up
    /// is logged and skipped; the ticker still runs.
    pub fn start(folder: impl AsRef<Path>, config: TesterConfig) -> Result<Self> {
        Self::start_with(folder, config, wait::build)
    }

    /// Like [`Tester::start`], with `build_waiter` in place of [`wait::build`].
    ///
    /// # Errors
    ///
    /// Same as [`Tester::start`].
    pub fn start_with(
        folder: impl AsRef<Path>,
        config: TesterConfig,
        build_waiter: impl FnOnce(WaitBackend, ClockId) -> Result<Box<dyn Waiter>>,
    ) -> Result<Self> {
        config.validate()?;
        let journal = Journal::create(folder.as_ref())?;

        journal.info(&format!(
            "tester started: tick={} wait={} on {} clock ({} backend) anomaly={}",
            Millis(as_nanos(config.tick_period())),
            Millis(as_nanos(config.wait_timeout())),
            config.wait_clock,
            config.wait_backend,
            Millis(as_nanos(config.anomaly_threshold())),
        ));
        if let Ok(now) = Snapshot::take() {
            journal.info(&format!("clocks: {now}"));
        }

        let waiter = match build_waiter(config.wait_backend, config.wait_clock) {
            Ok(waiter) => Some(waiter),
            Err(err) => {
                journal.error(&format!("failed to set up the timed waiter: {err}"));
                None
            }
        };
        let has_waiter = waiter.is_some();

        let shared = Arc::new(Shared {
            config,
            journal,
            keep_running: AtomicBool::new(true),
            stats: Mutex::new(Stats::default()),
            waiter,
        });

        let mut tester = Self {
            final_stats: None,
            shared: Arc::clone(&shared),
            ticker: None,
            waiter: None,
        };

        // an early return drops `tester`, which stops whatever was spawned
        tester.ticker = Some(spawn("ticker", Arc::clone(&shared), tick_loop)?);
        if has_waiter {
            tester.waiter = Some(spawn("waiter", shared, wait_loop)?);
        }

        debug!("tester writing to {}", tester.journal_path().display());
        Ok(tester)
    }

    #[must_use]
    pub fn config(&self) -> &TesterConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.final_stats.is_none() && self.shared.keep_running()
    }

    #[must_use]
    pub fn journal_path(&self) -> &Path {
        self.shared.journal.path()
    }

    /// Statistics so far; final once [`Tester::stop`] returned.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.final_stats.unwrap_or_else(|| self.shared.stats())
    }

    /// Stops both workers and waits for them to finish.
    ///
    /// The ticker finishes its current sleep first, so this can take up to
    /// one tick period. Calling `stop` again returns the same statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker panicked.
    pub fn stop(&mut self) -> Result<Stats> {
        if let Some(stats) = self.final_stats {
            return Ok(stats);
        }

        self.shared.keep_running.store(false, Ordering::Release);

        if let Some(waiter) = &self.shared.waiter
            && let Err(err) = waiter.notify()
        {
            self.shared
                .journal
                .error(&format!("failed to wake the waiter: {err}"));
        }

        let ticker = join("ticker", self.ticker.take());
        let waiter = join("waiter", self.waiter.take());

        let stats = self.shared.stats();
        self.shared.journal.info(&format!("summary: {stats}"));
        self.final_stats = Some(stats);

        ticker.and(waiter).map(|()| stats)
    }
}

impl Drop for Tester {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!("error stopping tester: {err}");
        }
    }
}

fn spawn(
    name: &'static str,
    shared: Arc<Shared>,
    work: fn(&Shared),
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || work(&shared))
        .map_err(|source| Error::Spawn { name, source })
}

fn join(name: &'static str, handle: Option<JoinHandle<()>>) -> Result<()> {
    handle.map_or(Ok(()), |handle| {
        handle.join().map_err(|_panic| Error::ThreadJoin { name })
    })
}

fn tick_loop(shared: &Shared) {
    let period = shared.config.tick_period();
    let threshold = shared.config.anomaly_threshold();

    while shared.keep_running() {
        let start = match Snapshot::take() {
            Ok(start) => start,
            Err(err) => {
                shared.journal.error(&format!("tick: {err}"));
                break;
            }
        };

        thread::sleep(period);

        let end = match Snapshot::take() {
            Ok(end) => end,
            Err(err) => {
                shared.journal.error(&format!("tick: {err}"));
                break;
            }
        };

        let tick = Measurement::new(start, end, period);
        let anomalous = shared.update_stats(|stats| stats.record_tick(&tick, threshold));
        let level = if anomalous { Level::Warn } else { Level::Info };
        shared.journal.record(level, &format!("tick: {tick}"));
    }

    shared.journal.info("ticker finished");
}

fn wait_loop(shared: &Shared) {
    let Some(waiter) = &shared.waiter else {
        return;
    };
    let timeout = shared.config.wait_timeout();
    let threshold = shared.config.anomaly_threshold();
    let announce = format!(
        "wait: before timed wait on {} clock for {}",
        waiter.clock(),
        Millis(as_nanos(timeout))
    );

    while shared.keep_running() {
        let start = match Snapshot::take() {
            Ok(start) => start,
            Err(err) => {
                shared.journal.error(&format!("wait: {err}"));
                break;
            }
        };

        shared.journal.info(&announce);

        let outcome = match waiter.wait(timeout) {
            Ok(outcome) => outcome,
            Err(err) => {
                shared.journal.error(&format!("wait: {err}"));
                break;
            }
        };

        let end = match Snapshot::take() {
            Ok(end) => end,
            Err(err) => {
                shared.journal.error(&format!("wait: {err}"));
                break;
            }
        };

        let interval = Measurement::new(start, end, timeout);
        let anomalous =
            shared.update_stats(|stats| stats.record_wait(outcome, &interval, threshold));
        let level = if anomalous { Level::Warn } else { Level::Info };
        shared
            .journal
            .record(level, &format!("wait: after timed wait ({outcome}): {interval}"));
    }

    shared.journal.info("waiter finished");
}
