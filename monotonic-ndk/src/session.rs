//! The one tester the activity controls.

use crate::Error;
use monotonic_core::{Stats, Tester, TesterConfig};
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{error, info};

static SESSION: Mutex<Option<Tester>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Tester>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Starts a tester logging into `folder`, stopping the running one first.
/// Returns the path of the new log file.
///
/// A broken `tester.json` is reported before anything is stopped.
pub fn start(folder: &Path) -> Result<PathBuf, Error> {
    let config = TesterConfig::load_from_folder(folder)?;

    let mut slot = slot();
    if let Some(mut previous) = slot.take() {
        match previous.stop() {
            Ok(stats) => info!("previous tester stopped: {stats}"),
            Err(err) => error!("error stopping previous tester: {err}"),
        }
    }

    let tester = Tester::start(folder, config)?;
    let path = tester.journal_path().to_path_buf();
    info!("tester started, logging to {}", path.display());
    *slot = Some(tester);

    Ok(path)
}

/// Stops the running tester. Returns `None` if there was none.
pub fn stop() -> Result<Option<Stats>, Error> {
    let Some(mut tester) = slot().take() else {
        return Ok(None);
    };

    let stats = tester.stop()?;
    info!("tester stopped: {stats}");
    Ok(Some(stats))
}

#[must_use]
pub fn is_running() -> bool {
    slot().as_ref().is_some_and(Tester::is_running)
}

#[must_use]
pub fn stats() -> Option<Stats> {
    slot().as_ref().map(Tester::stats)
}
