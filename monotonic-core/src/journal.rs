use crate::{Error, Result};
use chrono::Local;
use std::{
    fs::{self, File, OpenOptions},
    hash::{BuildHasher, RandomState},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{LazyLock, Mutex, PoisonError},
};
use tracing::{error, info, warn};

const FILE_STAMP: &str = "%Y-%m-%d_%H-%M-%S";
const LINE_STAMP: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl Level {
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Error => 'e',
            Self::Warn => 'w',
            Self::Info => 'i',
        }
    }
}

/// Timestamped text file the tester writes its findings to.
///
/// Each record is also forwarded to `tracing`, so it shows up in logcat on
/// Android.
pub struct Journal {
    file: Mutex<File>,
    path: PathBuf,
}

impl Journal {
    /// Opens a new `<local time>.txt` file inside `folder`, creating the
    /// folder if needed. Never truncates an existing file.
    pub fn create(folder: &Path) -> Result<Self> {
        let journal_err = |source| Error::Journal {
            path: folder.to_path_buf(),
            source,
        };

        fs::create_dir_all(folder).map_err(journal_err)?;

        let stamp = Local::now().format(FILE_STAMP).to_string();
        let mut attempt = 0_u32;
        loop {
            let name = if attempt == 0 {
                format!("{stamp}.txt")
            } else {
                format!("{stamp}_{attempt}.txt")
            };
            let path = folder.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(Self {
                        file: Mutex::new(file),
                        path,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(journal_err(err)),
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line for `message`. Empty messages are dropped.
    pub fn record(&self, level: Level, message: &str) {
        if message.is_empty() {
            return;
        }

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        match level {
            Level::Error => error!("{message}"),
            Level::Warn => warn!("{message}"),
            Level::Info => info!("{message}"),
        }

        let line = format!(
            "[{}][{}][{}]:{message}\n",
            Local::now().format(LINE_STAMP),
            level.code(),
            thread_tag()
        );

        let written = file.write_all(line.as_bytes()).and_then(|()| {
            if level == Level::Error {
                file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(err) = written {
            error!("failed to write to {}: {err}", self.path.display());
        }
    }

    pub fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }

    pub fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }
}

/// Thread name, or a stable hash of the thread id for unnamed threads.
fn thread_tag() -> String {
    static HASHER: LazyLock<RandomState> = LazyLock::new(RandomState::new);

    let current = std::thread::current();
    current.name().map_or_else(
        || HASHER.hash_one(current.id()).to_string(),
        ToOwned::to_owned,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn lines(journal: &Journal) -> Vec<String> {
        fs::read_to_string(journal.path())
            .unwrap()
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    #[test]
    fn file_name_is_a_local_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::create(dir.path()).unwrap();

        let name = journal.path().file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".txt"));
        let stamp = name.trim_end_matches(".txt");
        assert!(
            chrono::NaiveDateTime::parse_from_str(stamp, FILE_STAMP).is_ok(),
            "unexpected file name {name}"
        );
    }

    #[test]
    fn creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("nested").join("logs");
        let journal = Journal::create(&folder).unwrap();
        assert!(journal.path().starts_with(&folder));
        assert!(journal.path().is_file());
    }

    #[test]
    fn second_journal_in_same_second_gets_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = Journal::create(dir.path()).unwrap();
        first.info("first");
        let second = Journal::create(dir.path()).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(lines(&first).len(), 1);
    }

    #[test]
    fn line_format() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::create(dir.path()).unwrap();

        thread::scope(|scope| {
            thread::Builder::new()
                .name("ticker".to_owned())
                .spawn_scoped(scope, || journal.warn("tick"))
                .unwrap();
        });
        journal.error("boom");

        let lines = lines(&journal);
        assert_eq!(lines.len(), 2);

        let (stamp, rest) = lines[0].split_at(21);
        assert!(
            chrono::NaiveDateTime::parse_from_str(stamp, "[%Y-%m-%d %H:%M:%S]").is_ok(),
            "bad stamp in {}",
            lines[0]
        );
        assert_eq!(rest, "[w][ticker]:tick");
        assert!(lines[1].ends_with("]:boom"));
        assert!(lines[1].contains("][e]["));
    }

    #[test]
    fn empty_messages_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::create(dir.path()).unwrap();
        journal.info("");
        journal.error("");
        assert!(lines(&journal).is_empty());
    }

    #[test]
    fn unnamed_threads_get_a_numeric_tag() {
        let tag = thread::spawn(thread_tag).join().unwrap();
        assert!(tag.parse::<u64>().is_ok(), "tag {tag} is not numeric");
    }
}
