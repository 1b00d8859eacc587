//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// A low-level append-only byte store.
///
/// Backends hold the write-ahead log. They do not know about log entries or
/// line framing; `contactdb_core` owns the format.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - after `sync` returns, every appended byte survives process termination
/// - `truncate` is itself durable when it returns
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if the range extends beyond the
    /// current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Forces all appended data and file metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the device reports a failure.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to `new_size` bytes and syncs.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TruncatePastEnd`] if `new_size` is greater
    /// than the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Reads the entire contents of the storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if the contents cannot be
    /// addressed in memory, or any error from [`read_at`](Self::read_at).
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| StorageError::TooLarge { size })?;
        self.read_at(0, len)
    }
}
