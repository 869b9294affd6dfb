#[cfg(any(target_os = "linux", target_os = "android"))]
mod pthread;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use pthread::ClockCondvar;

use crate::{ClockId, Result};
use core::{fmt, str::FromStr, time::Duration};
use serde::{Deserialize, Serialize};
use std::sync::{Condvar, Mutex, PoisonError};
use tracing::warn;

/// Something a thread can block on until it is notified or a timeout runs
/// out.
///
/// A notification sent while nobody is waiting is remembered and ends the
/// next wait immediately.
pub trait Waiter: Send + Sync {
    /// Clock the timeout is measured against.
    fn clock(&self) -> ClockId;

    fn notify(&self) -> Result<()>;

    fn wait(&self, timeout: Duration) -> Result<WaitOutcome>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WaitOutcome {
    Notified,
    TimedOut,
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notified => f.write_str("notified"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitBackend {
    #[default]
    Pthread,
    Std,
}

impl WaitBackend {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pthread => "pthread",
            Self::Std => "std",
        }
    }
}

impl fmt::Display for WaitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown wait backend {0:?}, expected pthread or std")]
pub struct ParseBackendError(String);

impl FromStr for WaitBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pthread, Self::Std]
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseBackendError(s.to_owned()))
    }
}

/// Builds the waiter for `backend`, falling back to [`StdCondvar`] where
/// pthread condvars cannot be bound to `clock`.
pub fn build(backend: WaitBackend, clock: ClockId) -> Result<Box<dyn Waiter>> {
    match backend {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        WaitBackend::Pthread if ClockCondvar::supports(clock) => {
            Ok(Box::new(ClockCondvar::new(clock)?))
        }
        WaitBackend::Pthread => {
            warn!("pthread condvars cannot time out on the {clock} clock, using the std condvar");
            Ok(Box::new(StdCondvar::new()))
        }
        WaitBackend::Std => {
            if clock != ClockId::Monotonic {
                warn!("the std condvar ignores the {clock} clock and waits on monotonic time");
            }
            Ok(Box::new(StdCondvar::new()))
        }
    }
}

/// Waiter backed by `std::sync::Condvar`, which times out on the monotonic
/// clock.
pub struct StdCondvar {
    condvar: Condvar,
    pending: Mutex<bool>,
}

impl StdCondvar {
    #[must_use]
    #[expect(
        clippy::mutex_atomic,
        reason = "The flag has to be checked and cleared under the condvar's mutex"
    )]
    pub const fn new() -> Self {
        Self {
            condvar: Condvar::new(),
            pending: Mutex::new(false),
        }
    }
}

impl Default for StdCondvar {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter for StdCondvar {
    fn clock(&self) -> ClockId {
        ClockId::Monotonic
    }

    fn notify(&self) -> Result<()> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = true;
        self.condvar.notify_one();
        Ok(())
    }

    fn wait(&self, timeout: Duration) -> Result<WaitOutcome> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut pending, _) = self
            .condvar
            .wait_timeout_while(pending, timeout, |pending| !*pending)
            .unwrap_or_else(PoisonError::into_inner);

        if *pending {
            *pending = false;
            Ok(WaitOutcome::Notified)
        } else {
            Ok(WaitOutcome::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    fn waiters() -> Vec<Box<dyn Waiter>> {
        let mut waiters: Vec<Box<dyn Waiter>> = vec![Box::new(StdCondvar::new())];
        for clock in ClockId::ALL {
            waiters.push(build(WaitBackend::Pthread, clock).unwrap());
        }
        waiters
    }

    #[test]
    fn notify_before_wait_is_not_lost() {
        for waiter in waiters() {
            waiter.notify().unwrap();
            let start = Instant::now();
            let outcome = waiter.wait(Duration::from_secs(10)).unwrap();
            assert_eq!(outcome, WaitOutcome::Notified);
            assert!(start.elapsed() < Duration::from_secs(5));
        }
    }

    #[test]
    fn notification_is_consumed_once() {
        for waiter in waiters() {
            waiter.notify().unwrap();
            waiter.notify().unwrap();
            assert_eq!(waiter.wait(Duration::from_secs(10)).unwrap(), WaitOutcome::Notified);
            assert_eq!(
                waiter.wait(Duration::from_millis(10)).unwrap(),
                WaitOutcome::TimedOut
            );
        }
    }

    #[test]
    fn times_out_without_notification() {
        for waiter in waiters() {
            let start = Instant::now();
            let outcome = waiter.wait(Duration::from_millis(30)).unwrap();
            assert_eq!(outcome, WaitOutcome::TimedOut);
            assert!(
                start.elapsed() >= Duration::from_millis(25),
                "{} waiter returned after {:?}",
                waiter.clock(),
                start.elapsed()
            );
        }
    }

    #[test]
    fn notify_wakes_a_blocked_waiter() {
        for waiter in waiters() {
            let waiter: Arc<dyn Waiter> = Arc::from(waiter);
            let handle = {
                let waiter = Arc::clone(&waiter);
                thread::spawn(move || {
                    let start = Instant::now();
                    (waiter.wait(Duration::from_secs(30)).unwrap(), start.elapsed())
                })
            };

            thread::sleep(Duration::from_millis(20));
            waiter.notify().unwrap();

            let (outcome, elapsed) = handle.join().unwrap();
            assert_eq!(outcome, WaitOutcome::Notified);
            assert!(elapsed < Duration::from_secs(10));
        }
    }

    #[test]
    fn pthread_waiter_keeps_supported_clocks() {
        for clock in [ClockId::Realtime, ClockId::Monotonic] {
            let waiter = build(WaitBackend::Pthread, clock).unwrap();
            if cfg!(any(target_os = "linux", target_os = "android")) {
                assert_eq!(waiter.clock(), clock);
            } else {
                assert_eq!(waiter.clock(), ClockId::Monotonic);
            }
        }
    }

    #[test]
    fn pthread_on_boottime_falls_back_to_std_condvar() {
        let waiter = build(WaitBackend::Pthread, ClockId::Boottime).unwrap();
        assert_eq!(waiter.clock(), ClockId::Monotonic);
        assert_eq!(
            waiter.wait(Duration::from_millis(10)).unwrap(),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn backend_names_round_trip() {
        assert_eq!("pthread".parse::<WaitBackend>().unwrap(), WaitBackend::Pthread);
        assert_eq!("STD".parse::<WaitBackend>().unwrap(), WaitBackend::Std);
        assert!("futex".parse::<WaitBackend>().is_err());
        assert_eq!(WaitBackend::Std.to_string(), "std");
    }
}
