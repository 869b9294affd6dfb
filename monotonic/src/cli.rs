use core::time::Duration;
use monotonic_core::{ClockId, TesterConfig, WaitBackend};
use std::path::{Path, PathBuf};

pub const QUALIFIER: &str = "com";
pub const ORGANIZATION: &str = "example";
pub const MONOTONIC_BIN: &str = "monotonic";
pub const APP_NAME: &str = "test_monotonic";
const ABOUT: &str = "Measures sleeps and timed waits against the kernel clocks.";
const AFTER_HELP: &str = "Clocks:

    | Clock     | Counts while suspended | Follows wall clock changes |
    | --------- | ---------------------- | -------------------------- |
    | realtime  | yes                    | yes                        |
    | monotonic | no                     | no                         |
    | boottime  | yes                    | no                         |

The run command also reads tester.json from the log folder when present.
";

#[derive(clap::Parser)]
#[command(name = MONOTONIC_BIN, about = ABOUT, after_help = AFTER_HELP, version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(short, long, global = true, help = "Print debug messages")]
    verbose: bool,
}

impl Cli {
    #[must_use]
    #[inline]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    #[must_use]
    #[inline]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Print one reading of every clock
    Clocks,
    /// Run the tester until Enter is pressed or the duration runs out
    Run(RunArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    #[arg(long, help = "Threshold in milliseconds above which a wake-up is logged as a warning")]
    anomaly_ms: Option<u64>,
    #[arg(long, help = "Timed wait implementation", value_name = "pthread|std")]
    backend: Option<WaitBackend>,
    #[arg(
        long,
        help = "Clock the timed wait runs against",
        value_name = "realtime|monotonic|boottime"
    )]
    clock: Option<ClockId>,
    #[arg(
        short,
        long,
        help = "JSON config file",
        long_help = "JSON config file. Defaults to tester.json inside the log folder, \
           or the built-in defaults when that does not exist."
    )]
    config: Option<PathBuf>,
    #[arg(short, long, help = "Stop after this many seconds")]
    duration: Option<u64>,
    #[arg(short, long, help = "Folder the log file is written to")]
    folder: Option<PathBuf>,
    #[arg(long, help = "Print the summary as JSON")]
    json: bool,
    #[arg(long, help = "Sleep length of the ticker in milliseconds")]
    tick_ms: Option<u64>,
    #[arg(long, help = "Timeout of each timed wait in milliseconds")]
    wait_ms: Option<u64>,
}

impl RunArgs {
    /// Config file (or folder config) with the command line flags applied on
    /// top.
    pub fn config(&self, folder: &Path) -> monotonic_core::Result<TesterConfig> {
        let mut config = match &self.config {
            Some(path) => TesterConfig::load(path)?,
            None => TesterConfig::load_from_folder(folder)?,
        };

        if let Some(anomaly_ms) = self.anomaly_ms {
            config.anomaly_ms = anomaly_ms;
        }
        if let Some(backend) = self.backend {
            config.wait_backend = backend;
        }
        if let Some(clock) = self.clock {
            config.wait_clock = clock;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_period_ms = tick_ms;
        }
        if let Some(wait_ms) = self.wait_ms {
            config.wait_timeout_ms = wait_ms;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    #[inline]
    pub const fn duration(&self) -> Option<Duration> {
        match self.duration {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }

    #[must_use]
    pub fn folder(&self) -> PathBuf {
        self.folder.clone().unwrap_or_else(default_folder)
    }

    #[must_use]
    #[inline]
    pub const fn json(&self) -> bool {
        self.json
    }
}

/// Per-user data folder, the desktop counterpart of the app's files dir.
fn default_folder() -> PathBuf {
    directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APP_NAME)
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}
