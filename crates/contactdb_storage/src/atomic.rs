//! Whole-file replacement with write-then-rename.
//!
//! ```text
//! 1. write <name>.tmp
//! 2. fsync <name>.tmp
//! 3. rename <name>.tmp -> <name>
//! 4. fsync the parent directory
//! ```
//!
//! A reader opening `<name>` sees either the previous contents or the new
//! contents, never a prefix of the new ones.

use crate::error::StorageResult;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Returns the sibling temporary path used while replacing `path`.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replaces the file at `path` with `data`.
///
/// On failure the temporary file is removed (best effort) and the previous
/// contents of `path`, if any, are left in place.
///
/// # Errors
///
/// Returns an error if any write, sync or rename step fails.
pub fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let temp_path = temp_path_for(path);

    let result = write_and_rename(&temp_path, path, data);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, path)?;

    if let Some(parent) = path.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}

/// Reads the whole file at `path`, or `None` if it does not exist.
///
/// # Errors
///
/// Returns any I/O error other than "not found".
pub fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Syncs a directory so that creates and renames inside it are durable.
///
/// Windows NTFS journals metadata updates and has no directory fsync, so
/// this is a no-op there.
///
/// # Errors
///
/// Returns an error if the directory cannot be opened or synced.
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> StorageResult<()> {
    let dir = File::open(path)?;
    dir.sync_all()?;
    Ok(())
}

/// Syncs a directory so that creates and renames inside it are durable.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}
