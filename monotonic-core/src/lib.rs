//! Clock and timed-wait tester.
//!
//! Two workers block for a known amount of time, over and over, and record
//! how much time passed on the realtime, monotonic and boottime clocks every
//! time they wake up. Suspend gaps, late wake-ups and wall clock jumps end up
//! in a timestamped log file and in the platform log.

mod clock;
mod config;
mod error;
mod journal;
mod measure;
mod stats;
mod tester;
pub mod wait;

pub use clock::{ClockId, Elapsed, ParseClockError, Seconds, Snapshot};
pub use config::{CONFIG_FILE_NAME, TesterConfig};
pub use error::{Error, Result};
pub use journal::{Journal, Level};
pub use measure::{Measurement, Millis};
pub use stats::Stats;
pub use tester::Tester;
pub use wait::{WaitBackend, WaitOutcome, Waiter};
