//! Fault injection for the WAL backend.
//!
//! [`FaultyBackend`] wraps another backend and fails on demand. The engine
//! owns the backend once it is opened, so control goes through a cloned
//! [`FaultSwitch`].
//!
//! ```rust,ignore
//! let (backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
//! let engine = Engine::open_with_wal_backend(dir, Config::default(), Box::new(backend))?;
//! faults.fail_appends(true);
//! assert!(engine.add("Ann", "111", "").is_err());
//! ```

use contactdb_storage::{StorageBackend, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct FaultState {
    fail_appends: AtomicBool,
    tear_appends: AtomicBool,
    fail_syncs: AtomicBool,
    fail_truncates: AtomicBool,
    injected: AtomicUsize,
}

/// Shared control for a [`FaultyBackend`].
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    state: Arc<FaultState>,
}

impl FaultSwitch {
    /// Makes every append fail before writing anything.
    pub fn fail_appends(&self, fail: bool) {
        self.state.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes every append write the first half of its data and then fail.
    pub fn tear_appends(&self, tear: bool) {
        self.state.tear_appends.store(tear, Ordering::SeqCst);
    }

    /// Makes every sync fail.
    pub fn fail_syncs(&self, fail: bool) {
        self.state.fail_syncs.store(fail, Ordering::SeqCst);
    }

    /// Makes every truncate fail, so a torn append cannot be rolled back.
    pub fn fail_truncates(&self, fail: bool) {
        self.state.fail_truncates.store(fail, Ordering::SeqCst);
    }

    /// Turns every fault off.
    pub fn reset(&self) {
        self.fail_appends(false);
        self.tear_appends(false);
        self.fail_syncs(false);
        self.fail_truncates(false);
    }

    /// Number of failures injected so far.
    #[must_use]
    pub fn injected(&self) -> usize {
        self.state.injected.load(Ordering::SeqCst)
    }

    fn inject(&self, what: &str) -> StorageError {
        self.state.injected.fetch_add(1, Ordering::SeqCst);
        StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {what} failure"),
        ))
    }
}

/// A storage backend wrapper that fails when its [`FaultSwitch`] says so.
pub struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    switch: FaultSwitch,
}

impl FaultyBackend {
    /// Wraps `inner` and returns the backend with its switch.
    pub fn wrap(inner: Box<dyn StorageBackend>) -> (Self, FaultSwitch) {
        let switch = FaultSwitch::default();
        (Self::with_switch(inner, switch.clone()), switch)
    }

    /// Wraps `inner` under an existing switch, so faults survive a reopen.
    pub fn with_switch(inner: Box<dyn StorageBackend>, switch: FaultSwitch) -> Self {
        Self { inner, switch }
    }
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = &self.switch.state;
        if state.fail_appends.load(Ordering::SeqCst) {
            return Err(self.switch.inject("append"));
        }
        if state.tear_appends.load(Ordering::SeqCst) {
            let _ = self.inner.append(&data[..data.len() / 2]);
            return Err(self.switch.inject("torn append"));
        }
        self.inner.append(data)
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.switch.state.fail_syncs.load(Ordering::SeqCst) {
            return Err(self.switch.inject("sync"));
        }
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if self.switch.state.fail_truncates.load(Ordering::SeqCst) {
            return Err(self.switch.inject("truncate"));
        }
        self.inner.truncate(new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactdb_storage::InMemoryBackend;

    #[test]
    fn passes_through_when_off() {
        let (mut backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
        backend.append(b"hello").unwrap();
        backend.sync().unwrap();

        assert_eq!(backend.read_all().unwrap(), b"hello");
        assert_eq!(faults.injected(), 0);
    }

    #[test]
    fn failed_append_writes_nothing() {
        let (mut backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
        faults.fail_appends(true);

        assert!(backend.append(b"hello").is_err());
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(faults.injected(), 1);
    }

    #[test]
    fn torn_append_leaves_prefix() {
        let (mut backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
        faults.tear_appends(true);

        assert!(backend.append(b"abcdef").is_err());
        assert_eq!(backend.read_all().unwrap(), b"abc");
    }

    #[test]
    fn reset_clears_faults() {
        let (mut backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
        faults.fail_syncs(true);
        assert!(backend.sync().is_err());

        faults.reset();
        backend.sync().unwrap();
    }

    #[test]
    fn failed_truncate_keeps_data() {
        let (mut backend, faults) = FaultyBackend::wrap(Box::new(InMemoryBackend::new()));
        backend.append(b"abcdef").unwrap();
        faults.fail_truncates(true);

        assert!(backend.truncate(3).is_err());
        assert_eq!(backend.read_all().unwrap(), b"abcdef");
    }
}
