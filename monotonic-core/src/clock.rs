#![expect(unsafe_code, reason = "clock_gettime is only reachable through libc")]

use crate::{Error, Result};
use core::{fmt, mem::MaybeUninit, str::FromStr, time::Duration};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Kernel clocks the tester reads.
///
/// `Boottime` keeps counting while the device is suspended, `Monotonic` does
/// not, and `Realtime` follows wall clock adjustments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockId {
    Boottime,
    Monotonic,
    #[default]
    Realtime,
}

impl ClockId {
    pub const ALL: [Self; 3] = [Self::Realtime, Self::Monotonic, Self::Boottime];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boottime => "boottime",
            Self::Monotonic => "monotonic",
            Self::Realtime => "realtime",
        }
    }

    /// Reads the clock, returning the time since its epoch.
    pub fn now(self) -> Result<Duration> {
        let mut ts = MaybeUninit::<libc::timespec>::uninit();
        // SAFETY: `ts` is a valid out pointer and is only read on success.
        let rc = unsafe { libc::clock_gettime(self.raw(), ts.as_mut_ptr()) };
        if rc != 0 {
            return Err(Error::Clock {
                clock: self,
                source: std::io::Error::last_os_error(),
            });
        }
        // SAFETY: clock_gettime returned 0 so the struct is initialized.
        let ts = unsafe { ts.assume_init() };

        Ok(Duration::new(
            u64::try_from(ts.tv_sec).unwrap_or_default(),
            u32::try_from(ts.tv_nsec).unwrap_or_default(),
        ))
    }

    pub(crate) const fn raw(self) -> libc::clockid_t {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::Boottime => libc::CLOCK_BOOTTIME,
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            Self::Boottime => libc::CLOCK_MONOTONIC,
            Self::Monotonic => libc::CLOCK_MONOTONIC,
            Self::Realtime => libc::CLOCK_REALTIME,
        }
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown clock {0:?}, expected one of: realtime, monotonic, boottime")]
pub struct ParseClockError(String);

impl FromStr for ClockId {
    type Err = ParseClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|clock| clock.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseClockError(s.to_owned()))
    }
}

/// One reading of every clock, taken back to back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    boottime: i64,
    monotonic: i64,
    realtime: i64,
}

impl Snapshot {
    pub fn take() -> Result<Self> {
        Ok(Self {
            monotonic: as_nanos(ClockId::Monotonic.now()?),
            boottime: as_nanos(ClockId::Boottime.now()?),
            realtime: as_nanos(ClockId::Realtime.now()?),
        })
    }

    #[must_use]
    pub const fn from_nanos(realtime: i64, monotonic: i64, boottime: i64) -> Self {
        Self {
            boottime,
            monotonic,
            realtime,
        }
    }

    #[must_use]
    pub const fn get(self, clock: ClockId) -> i64 {
        match clock {
            ClockId::Boottime => self.boottime,
            ClockId::Monotonic => self.monotonic,
            ClockId::Realtime => self.realtime,
        }
    }

    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> Elapsed {
        Elapsed {
            boottime: self.boottime.saturating_sub(earlier.boottime),
            monotonic: self.monotonic.saturating_sub(earlier.monotonic),
            realtime: self.realtime.saturating_sub(earlier.realtime),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clock) in ClockId::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{clock}={}s", Seconds(self.get(clock)))?;
        }
        Ok(())
    }
}

/// Signed nanoseconds shown as seconds with nine decimals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seconds(pub i64);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.0.div_euclid(NANOS_PER_SEC),
            self.0.rem_euclid(NANOS_PER_SEC)
        )
    }
}

/// Signed nanoseconds that passed on each clock between two snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Elapsed {
    pub boottime: i64,
    pub monotonic: i64,
    pub realtime: i64,
}

impl Elapsed {
    /// Time spent suspended: boottime keeps running, monotonic stops.
    #[must_use]
    pub const fn suspended(self) -> i64 {
        self.boottime.saturating_sub(self.monotonic)
    }

    /// Wall clock steps or slew relative to boottime.
    #[must_use]
    pub const fn wall_skew(self) -> i64 {
        self.realtime.saturating_sub(self.boottime)
    }
}

pub(crate) fn as_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_never_goes_backwards() {
        let mut last = ClockId::Monotonic.now().unwrap();
        for _ in 0..1000 {
            let now = ClockId::Monotonic.now().unwrap();
            assert!(now >= last, "monotonic clock went backwards");
            last = now;
        }
    }

    #[test]
    fn every_clock_is_readable() {
        for clock in ClockId::ALL {
            assert!(clock.now().is_ok(), "failed to read {clock}");
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("realtime".parse::<ClockId>().unwrap(), ClockId::Realtime);
        assert_eq!("MONOTONIC".parse::<ClockId>().unwrap(), ClockId::Monotonic);
        assert_eq!("BootTime".parse::<ClockId>().unwrap(), ClockId::Boottime);
        assert!("tai".parse::<ClockId>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ClockId::Boottime).unwrap();
        assert_eq!(json, "\"boottime\"");
        let clock: ClockId = serde_json::from_str("\"monotonic\"").unwrap();
        assert_eq!(clock, ClockId::Monotonic);
    }

    #[test]
    fn elapsed_reports_suspend_and_skew() {
        let before = Snapshot::from_nanos(1_000, 1_000, 1_000);
        let after = Snapshot::from_nanos(2_000 + 50_000, 2_000, 32_000);
        let elapsed = after.elapsed_since(before);

        assert_eq!(elapsed.monotonic, 1_000);
        assert_eq!(elapsed.boottime, 31_000);
        assert_eq!(elapsed.suspended(), 30_000);
        assert_eq!(elapsed.wall_skew(), 20_000);
    }

    #[test]
    fn realtime_can_move_backwards() {
        let before = Snapshot::from_nanos(10_000, 0, 0);
        let after = Snapshot::from_nanos(4_000, 1_000, 1_000);
        assert_eq!(after.elapsed_since(before).realtime, -6_000);
    }

    #[test]
    fn snapshot_display_lists_every_clock() {
        let snapshot = Snapshot::from_nanos(1_500_000_000, 2_000_000_001, 3);
        assert_eq!(
            snapshot.to_string(),
            "realtime=1.500000000s monotonic=2.000000001s boottime=0.000000003s"
        );
    }

    #[test]
    fn seconds_keep_nanosecond_digits() {
        assert_eq!(Seconds(12_000_000_345).to_string(), "12.000000345");
        assert_eq!(Seconds(0).to_string(), "0.000000000");
    }
}
