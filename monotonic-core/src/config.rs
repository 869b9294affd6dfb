use crate::{ClockId, Error, Result, WaitBackend};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

/// Name of the optional config file looked up in the log folder.
pub const CONFIG_FILE_NAME: &str = "tester.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterConfig {
    pub anomaly_ms: u64,
    pub tick_period_ms: u64,
    pub wait_backend: WaitBackend,
    pub wait_clock: ClockId,
    pub wait_timeout_ms: u64,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            anomaly_ms: 1000,
            tick_period_ms: 5000,
            wait_backend: WaitBackend::Pthread,
            wait_clock: ClockId::Realtime,
            wait_timeout_ms: 5 * 60 * 1000,
        }
    }
}

impl TesterConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reads `folder/tester.json`, or returns the defaults when it does not
    /// exist.
    pub fn load_from_folder(folder: &Path) -> Result<Self> {
        let path = folder.join(CONFIG_FILE_NAME);
        match Self::load(&path) {
            Err(Error::ConfigRead { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            return Err(Error::InvalidConfig("tick_period_ms must be positive"));
        }
        if self.wait_timeout_ms == 0 {
            return Err(Error::InvalidConfig("wait_timeout_ms must be positive"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn anomaly_threshold(&self) -> Duration {
        Duration::from_millis(self.anomaly_ms)
    }

    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
