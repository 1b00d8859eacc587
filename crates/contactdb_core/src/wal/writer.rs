//! WAL writer and reader.

use super::entry::WalEntry;
use crate::error::{CoreError, CoreResult};
use contactdb_storage::StorageBackend;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Decoded contents of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalContents {
    /// Complete entries in file order.
    pub entries: Vec<WalEntry>,
    /// Bytes of an incomplete final line that were discarded.
    pub torn_bytes: usize,
}

struct WalLog {
    backend: Box<dyn StorageBackend>,
    /// End of the last complete line, set while a failed append could not
    /// be rolled back. No append lands until the log is cut back to it.
    torn_from: Option<u64>,
}

/// Manages WAL appends, replay and truncation.
pub struct WalManager {
    /// Storage backend for WAL data.
    log: Mutex<WalLog>,
    /// Whether to sync after each append.
    sync_on_append: bool,
}

impl WalManager {
    /// Creates a new WAL manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_append: bool) -> Self {
        Self {
            log: Mutex::new(WalLog {
                backend,
                torn_from: None,
            }),
            sync_on_append,
        }
    }

    /// Appends one entry as a JSON line and syncs it to the device.
    ///
    /// Returns the offset where the line starts. If the write or sync
    /// fails, the log is cut back to its previous length so a partial line
    /// cannot merge with the next append. If that cut fails too, every
    /// later append first retries it and is refused while it keeps failing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WalWriteFailure`] if the backend rejects the
    /// write or the sync, or a partial line is still waiting to be cut.
    pub fn append(&self, entry: &WalEntry) -> CoreResult<u64> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut log = self.log.lock();
        if let Some(len) = log.torn_from {
            log.backend
                .truncate(len)
                .map_err(|source| CoreError::WalWriteFailure { source })?;
            log.torn_from = None;
            debug!(len, "partial WAL append rolled back");
        }

        let before = log
            .backend
            .size()
            .map_err(|source| CoreError::WalWriteFailure { source })?;

        let backend = &mut log.backend;
        let written = backend.append(&line).and_then(|offset| {
            if self.sync_on_append {
                backend.sync()?;
            }
            Ok(offset)
        });

        written.map_err(|source| {
            if let Err(err) = log.backend.truncate(before) {
                warn!(error = %err, "could not roll back partial WAL append, refusing appends");
                log.torn_from = Some(before);
            }
            CoreError::WalWriteFailure { source }
        })
    }

    /// Reads and decodes the whole log.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WalCorruption`] for a complete line that is not
    /// a valid entry, or a storage error if the log cannot be read.
    pub fn read(&self) -> CoreResult<WalContents> {
        let data = self.log.lock().backend.read_all()?;
        decode_lines(&data)
    }

    /// Returns all complete entries in file order. The log is not cleared.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn replay(&self) -> CoreResult<Vec<WalEntry>> {
        Ok(self.read()?.entries)
    }

    /// Durably empties the log.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the truncation or sync fails.
    pub fn truncate(&self) -> CoreResult<()> {
        let mut log = self.log.lock();
        log.backend.truncate(0)?;
        log.torn_from = None;
        Ok(())
    }

    /// Returns the number of complete entries in the log.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn entry_count(&self) -> CoreResult<usize> {
        Ok(self.read()?.entries.len())
    }

    /// Cuts `torn_bytes` off the end of the log.
    ///
    /// Used after [`read`](Self::read) reported a torn tail, so the next
    /// append starts on a fresh line.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the truncation fails.
    pub fn discard_tail(&self, torn_bytes: usize) -> CoreResult<()> {
        let mut log = self.log.lock();
        let new_size = log.backend.size()?.saturating_sub(torn_bytes as u64);
        log.backend.truncate(new_size)?;
        if log.torn_from.is_some_and(|len| new_size <= len) {
            log.torn_from = None;
        }
        Ok(())
    }

    /// Returns the current WAL size in bytes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the size cannot be read.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.log.lock().backend.size()?)
    }

    /// Returns true if the log holds no bytes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the size cannot be read.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.size()? == 0)
    }
}

impl std::fmt::Debug for WalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalManager")
            .field("sync_on_append", &self.sync_on_append)
            .finish_non_exhaustive()
    }
}

fn decode_lines(data: &[u8]) -> CoreResult<WalContents> {
    let mut contents = WalContents::default();

    let complete_len = match data.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None => 0,
    };
    let (complete, torn) = data.split_at(complete_len);
    if !torn.iter().all(u8::is_ascii_whitespace) {
        contents.torn_bytes = torn.len();
    }

    for (index, line) in complete.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let entry = serde_json::from_slice(line)
            .map_err(|e| CoreError::wal_corruption(index + 1, e.to_string()))?;
        contents.entries.push(entry);
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordEdit};
    use crate::types::RecordId;
    use contactdb_storage::InMemoryBackend;

    fn create_wal() -> WalManager {
        WalManager::new(Box::new(InMemoryBackend::new()), true)
    }

    fn wal_with(data: &[u8]) -> WalManager {
        WalManager::new(Box::new(InMemoryBackend::with_data(data.to_vec())), true)
    }

    fn ann() -> Record {
        Record::new(RecordId::new(1), "Ann", "111", "")
    }

    #[test]
    fn append_and_replay_in_order() {
        let wal = create_wal();
        let add = WalEntry::add(&ann());
        let edit = WalEntry::edit(&ann(), &RecordEdit::new().remark("work"));
        let delete = WalEntry::delete(&ann());

        assert_eq!(wal.append(&add).unwrap(), 0);
        wal.append(&edit).unwrap();
        wal.append(&delete).unwrap();

        assert_eq!(wal.replay().unwrap(), vec![add, edit, delete]);
    }

    #[test]
    fn replay_does_not_clear() {
        let wal = create_wal();
        wal.append(&WalEntry::add(&ann())).unwrap();

        assert_eq!(wal.replay().unwrap().len(), 1);
        assert_eq!(wal.replay().unwrap().len(), 1);
    }

    #[test]
    fn read_empty_wal() {
        let wal = create_wal();
        assert!(wal.replay().unwrap().is_empty());
        assert!(wal.is_empty().unwrap());
    }

    #[test]
    fn truncate_empties_log() {
        let wal = create_wal();
        wal.append(&WalEntry::add(&ann())).unwrap();
        assert!(wal.size().unwrap() > 0);

        wal.truncate().unwrap();
        assert!(wal.is_empty().unwrap());
        assert!(wal.replay().unwrap().is_empty());
    }

    #[test]
    fn lines_are_newline_terminated_json() {
        let wal = create_wal();
        wal.append(&WalEntry::delete(&ann())).unwrap();

        let size = wal.size().unwrap();
        let data = wal.log.lock().backend.read_all().unwrap();
        assert_eq!(data.len() as u64, size);
        assert_eq!(data.last(), Some(&b'\n'));
        assert!(data.starts_with(br#"{"op":"delete","data":{"id":1"#));
    }

    #[test]
    fn torn_tail_is_ignored() {
        let torn = b"{\"op\":\"add\",\"da";
        let mut data = b"{\"op\":\"delete\",\"data\":{\"id\":1,\"name\":\"Ann\"}}\n".to_vec();
        data.extend_from_slice(torn);
        let wal = wal_with(&data);

        let contents = wal.read().unwrap();
        assert_eq!(contents.entries.len(), 1);
        assert_eq!(contents.torn_bytes, torn.len());
    }

    #[test]
    fn discard_tail_restores_clean_append() {
        let wal = create_wal();
        wal.append(&WalEntry::delete(&ann())).unwrap();
        wal.log.lock().backend.append(b"{\"op\":").unwrap();

        let torn = wal.read().unwrap().torn_bytes;
        wal.discard_tail(torn).unwrap();
        wal.append(&WalEntry::add(&ann())).unwrap();

        let contents = wal.read().unwrap();
        assert_eq!(contents.torn_bytes, 0);
        assert_eq!(wal.entry_count().unwrap(), 2);
        assert_eq!(contents.entries[1], WalEntry::add(&ann()));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let wal = wal_with(b"\n{\"op\":\"delete\",\"data\":{\"id\":3,\"name\":\"Cy\"}}\n\n  \n");

        let contents = wal.read().unwrap();
        assert_eq!(contents.entries.len(), 1);
        assert_eq!(contents.torn_bytes, 0);
    }

    #[test]
    fn corrupt_complete_line_is_fatal() {
        let wal = wal_with(
            b"{\"op\":\"delete\",\"data\":{\"id\":1,\"name\":\"Ann\"}}\nnot json\n",
        );

        match wal.replay() {
            Err(CoreError::WalCorruption { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {other:?}"),
        }
    }
}
