use crate::{
    WaitOutcome,
    clock::as_nanos,
    measure::{Measurement, Millis},
};
use core::{fmt, time::Duration};
use serde::Serialize;

/// Running totals over every tick and wait of one tester run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub anomalous_ticks: u64,
    pub anomalous_waits: u64,
    pub max_suspended_ns: i64,
    pub max_tick_overshoot_ns: i64,
    pub max_wait_overshoot_ns: i64,
    pub ticks: u64,
    pub wait_notified: u64,
    pub wait_timeouts: u64,
    pub wall_jumps: u64,
}

impl Stats {
    /// Returns whether the tick was anomalous.
    pub fn record_tick(&mut self, tick: &Measurement, threshold: Duration) -> bool {
        self.ticks += 1;
        self.max_tick_overshoot_ns = self.max_tick_overshoot_ns.max(tick.overshoot());
        self.record_clocks(tick, threshold);

        let anomalous = tick.is_anomalous(threshold);
        if anomalous {
            self.anomalous_ticks += 1;
        }
        anomalous
    }

    /// Returns whether the wait was anomalous. Only timed out waits have a
    /// meaningful overshoot.
    pub fn record_wait(
        &mut self,
        outcome: WaitOutcome,
        wait: &Measurement,
        threshold: Duration,
    ) -> bool {
        self.record_clocks(wait, threshold);

        let anomalous = match outcome {
            WaitOutcome::Notified => {
                self.wait_notified += 1;
                wait.clocks_diverge(threshold)
            }
            WaitOutcome::TimedOut => {
                self.wait_timeouts += 1;
                self.max_wait_overshoot_ns = self.max_wait_overshoot_ns.max(wait.overshoot());
                wait.is_anomalous(threshold)
            }
        };
        if anomalous {
            self.anomalous_waits += 1;
        }
        anomalous
    }

    #[must_use]
    pub const fn waits(&self) -> u64 {
        self.wait_notified + self.wait_timeouts
    }

    fn record_clocks(&mut self, interval: &Measurement, threshold: Duration) {
        let elapsed = interval.elapsed();
        self.max_suspended_ns = self.max_suspended_ns.max(elapsed.suspended());
        if elapsed.wall_skew().unsigned_abs() > as_nanos(threshold).unsigned_abs() {
            self.wall_jumps += 1;
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} (anomalous={}, max overshoot={}) waits={} (timed out={}, notified={}, \
             anomalous={}, max overshoot={}) max suspended={} wall jumps={}",
            self.ticks,
            self.anomalous_ticks,
            Millis(self.max_tick_overshoot_ns),
            self.waits(),
            self.wait_timeouts,
            self.wait_notified,
            self.anomalous_waits,
            Millis(self.max_wait_overshoot_ns),
            Millis(self.max_suspended_ns),
            self.wall_jumps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Snapshot;

    const MS: i64 = 1_000_000;
    const THRESHOLD: Duration = Duration::from_secs(1);

    fn interval(realtime: i64, monotonic: i64, boottime: i64, expected_ms: u64) -> Measurement {
        Measurement::new(
            Snapshot::from_nanos(0, 0, 0),
            Snapshot::from_nanos(realtime * MS, monotonic * MS, boottime * MS),
            Duration::from_millis(expected_ms),
        )
    }

    #[test]
    fn counts_ticks_and_keeps_worst_overshoot() {
        let mut stats = Stats::default();
        assert!(!stats.record_tick(&interval(5_010, 5_010, 5_010, 5_000), THRESHOLD));
        assert!(stats.record_tick(&interval(8_000, 8_000, 8_000, 5_000), THRESHOLD));
        assert!(!stats.record_tick(&interval(5_001, 5_001, 5_001, 5_000), THRESHOLD));

        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.anomalous_ticks, 1);
        assert_eq!(stats.max_tick_overshoot_ns, 3_000 * MS);
    }

    #[test]
    fn notified_waits_ignore_overshoot() {
        let mut stats = Stats::default();
        let short = interval(100, 100, 100, 300_000);
        assert!(!stats.record_wait(WaitOutcome::Notified, &short, THRESHOLD));

        assert_eq!(stats.wait_notified, 1);
        assert_eq!(stats.waits(), 1);
        assert_eq!(stats.max_wait_overshoot_ns, 0);
        assert_eq!(stats.anomalous_waits, 0);
    }

    #[test]
    fn timed_out_wait_across_suspend() {
        let mut stats = Stats::default();
        // realtime deadline passed while monotonic was frozen for ten minutes
        let wait = interval(900_000, 300_000, 900_000, 300_000);
        assert!(stats.record_wait(WaitOutcome::TimedOut, &wait, THRESHOLD));

        assert_eq!(stats.wait_timeouts, 1);
        assert_eq!(stats.anomalous_waits, 1);
        assert_eq!(stats.max_suspended_ns, 600_000 * MS);
        assert_eq!(stats.wall_jumps, 0);
    }

    #[test]
    fn wall_clock_steps_are_counted() {
        let mut stats = Stats::default();
        stats.record_tick(&interval(3_605_000, 5_000, 5_000, 5_000), THRESHOLD);
        assert_eq!(stats.wall_jumps, 1);
    }

    #[test]
    fn summary_line() {
        let mut stats = Stats::default();
        stats.record_tick(&interval(5_002, 5_002, 5_002, 5_000), THRESHOLD);
        assert_eq!(
            stats.to_string(),
            "ticks=1 (anomalous=0, max overshoot=2.000ms) waits=0 (timed out=0, notified=0, \
             anomalous=0, max overshoot=0.000ms) max suspended=0.000ms wall jumps=0"
        );
    }
}
