use crate::clock::ClockId;
use std::path::PathBuf;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reading the {clock} clock failed: {source}")]
    Clock {
        clock: ClockId,
        source: std::io::Error,
    },
    #[error("{op} failed with code {code}")]
    Condvar { op: &'static str, code: i32 },
    #[error("invalid tester config: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to parse tester config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("failed to read tester config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create log file in {path}: {source}")]
    Journal {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to spawn the {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
    #[error("the {name} thread panicked")]
    ThreadJoin { name: &'static str },
}
