use crate::clock::{Elapsed, Snapshot, as_nanos};
use core::{fmt, time::Duration};
use serde::Serialize;

/// Signed nanoseconds rendered as milliseconds with microsecond precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Millis(pub i64);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}ms", abs / 1_000_000, (abs / 1_000) % 1_000)
    }
}

/// How long one blocking call was asked to take and how long it took on
/// every clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Measurement {
    elapsed: Elapsed,
    expected: i64,
}

impl Measurement {
    #[must_use]
    pub fn new(start: Snapshot, end: Snapshot, expected: Duration) -> Self {
        Self {
            elapsed: end.elapsed_since(start),
            expected: as_nanos(expected),
        }
    }

    #[must_use]
    pub const fn elapsed(&self) -> Elapsed {
        self.elapsed
    }

    #[must_use]
    pub const fn expected(&self) -> i64 {
        self.expected
    }

    /// True when the device was suspended or the wall clock moved by more
    /// than `threshold` during the interval.
    #[must_use]
    pub fn clocks_diverge(&self, threshold: Duration) -> bool {
        let threshold = as_nanos(threshold).unsigned_abs();
        self.elapsed.suspended().unsigned_abs() > threshold
            || self.elapsed.wall_skew().unsigned_abs() > threshold
    }

    #[must_use]
    pub fn is_anomalous(&self, threshold: Duration) -> bool {
        self.overshoot().unsigned_abs() > as_nanos(threshold).unsigned_abs()
            || self.clocks_diverge(threshold)
    }

    /// Monotonic time beyond what was asked for; negative when the call
    /// returned early.
    #[must_use]
    pub const fn overshoot(&self) -> i64 {
        self.elapsed.monotonic.saturating_sub(self.expected)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected={} monotonic={} boottime={} realtime={} overshoot={} suspended={} skew={}",
            Millis(self.expected),
            Millis(self.elapsed.monotonic),
            Millis(self.elapsed.boottime),
            Millis(self.elapsed.realtime),
            Millis(self.overshoot()),
            Millis(self.elapsed.suspended()),
            Millis(self.elapsed.wall_skew()),
        )
    }
}
