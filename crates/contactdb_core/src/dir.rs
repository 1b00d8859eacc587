//! Data directory management.
//!
//! ```text
//! <data_dir>/
//! ├─ LOCK              # Advisory lock for single-owner access
//! ├─ contacts.json     # Records snapshot
//! ├─ indexes.cbor      # Prefix/suffix trie snapshot
//! └─ wal.log           # Write-ahead log (JSON lines)
//! ```
//!
//! The LOCK file ensures only one engine owns the files at a time.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const RECORDS_FILE: &str = "contacts.json";
const INDEXES_FILE: &str = "indexes.cbor";
const WAL_FILE: &str = "wal.log";

/// An opened, exclusively locked data directory.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct DataDir {
    path: PathBuf,
    _lock_file: File,
}

impl DataDir {
    /// Takes the lock on the contact store at `path`, creating the
    /// directory first when `create_if_missing` allows it.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` when nothing is at `path` and creation is off, or
    /// when `path` is a regular file. `DatabaseLocked` when another engine
    /// owns the store.
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CoreError::invalid_format(format!(
                    "{} is a file, not a contact store",
                    path.display()
                )));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if !create_if_missing {
                    return Err(CoreError::invalid_format(format!(
                        "no contact store at {} (create_if_missing is off)",
                        path.display()
                    )));
                }
                fs::create_dir_all(path)?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: take_lock(path)?,
        })
    }

    /// Returns the path to the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the records snapshot.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.path.join(RECORDS_FILE)
    }

    /// Returns the path to the index snapshot.
    #[must_use]
    pub fn indexes_path(&self) -> PathBuf {
        self.path.join(INDEXES_FILE)
    }

    /// Returns the path to the WAL file.
    #[must_use]
    pub fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_FILE)
    }
}

/// Opens `LOCK` inside `dir` and holds it exclusively.
fn take_lock(dir: &Path) -> CoreResult<File> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;
    file.try_lock_exclusive().map_err(|_| CoreError::DatabaseLocked)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("contacts");

        let dir = DataDir::open(&path, true).unwrap();
        assert!(path.is_dir());
        assert!(dir.path().join("LOCK").exists());
    }

    #[test]
    fn open_fails_if_missing_and_no_create() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent");

        let err = DataDir::open(&path, false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
        assert!(err.to_string().contains("no contact store at"));
        assert!(!path.exists());
    }

    #[test]
    fn open_rejects_plain_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        assert!(DataDir::open(&path, true).is_err());
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let _first = DataDir::open(temp.path(), true).unwrap();

        let second = DataDir::open(temp.path(), true);
        assert!(matches!(second, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(DataDir::open(temp.path(), true).unwrap());

        assert!(DataDir::open(temp.path(), true).is_ok());
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let dir = DataDir::open(temp.path(), true).unwrap();

        assert_eq!(dir.records_path(), temp.path().join("contacts.json"));
        assert_eq!(dir.indexes_path(), temp.path().join("indexes.cbor"));
        assert_eq!(dir.wal_path(), temp.path().join("wal.log"));
    }
}
