//! Test fixtures and engine helpers.
//!
//! [`TestStore`] keeps an engine in a temporary directory and can drop it
//! without a clean shutdown, reopen it, write raw WAL entries behind its
//! back, and make snapshot writes fail.

use crate::fault::{FaultSwitch, FaultyBackend};
use contactdb_core::{Config, Engine, WalEntry, WalManager};
use contactdb_storage::{temp_path_for, FileBackend};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An engine in a temporary directory with automatic cleanup.
pub struct TestStore {
    engine: Option<Engine>,
    config: Config,
    faults: Option<FaultSwitch>,
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a store with `config`.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = Self {
            engine: None,
            config,
            faults: None,
            temp_dir,
        };
        store.open();
        store
    }

    /// Creates a store whose WAL goes through a [`FaultyBackend`] over
    /// `wal.log`.
    pub fn with_faults() -> (Self, FaultSwitch) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = Self {
            engine: None,
            config: Config::default(),
            faults: Some(FaultSwitch::default()),
            temp_dir,
        };
        store.open();
        let faults = store
            .faults
            .clone()
            .expect("store was created with faults");
        (store, faults)
    }

    /// Returns the open engine.
    pub fn engine(&self) -> &Engine {
        self.engine.as_ref().expect("engine is closed")
    }

    /// Returns the data directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the WAL file path.
    pub fn wal_path(&self) -> PathBuf {
        self.path().join("wal.log")
    }

    /// Returns the records snapshot path.
    pub fn records_path(&self) -> PathBuf {
        self.path().join("contacts.json")
    }

    /// Returns the index snapshot path.
    pub fn indexes_path(&self) -> PathBuf {
        self.path().join("indexes.cbor")
    }

    /// Drops the engine without any shutdown step.
    ///
    /// Files are left exactly as the last completed mutation wrote them.
    pub fn crash(&mut self) {
        self.engine = None;
    }

    /// Crashes and opens the directory again, running recovery.
    pub fn reopen(&mut self) {
        self.crash();
        self.open();
    }

    /// Opens the directory, returning the error instead of panicking.
    pub fn try_reopen(&mut self) -> contactdb_core::CoreResult<()> {
        self.crash();
        self.engine = Some(self.open_engine()?);
        Ok(())
    }

    /// Appends `entry` to `wal.log` while the engine is closed, as if the
    /// process died right after logging it.
    pub fn append_wal(&mut self, entry: &WalEntry) {
        self.crash();
        let backend = FileBackend::open(&self.wal_path()).expect("Failed to open WAL");
        WalManager::new(Box::new(backend), true)
            .append(entry)
            .expect("Failed to append WAL entry");
    }

    /// Appends raw bytes to `wal.log` while the engine is closed.
    pub fn append_wal_bytes(&mut self, bytes: &[u8]) {
        use contactdb_storage::StorageBackend;

        self.crash();
        let mut backend = FileBackend::open(&self.wal_path()).expect("Failed to open WAL");
        backend.append(bytes).expect("Failed to append WAL bytes");
        backend.sync().expect("Failed to sync WAL");
    }

    /// Returns the number of complete entries in `wal.log`.
    pub fn wal_entry_count(&self) -> usize {
        fs::read_to_string(self.wal_path())
            .map(|text| text.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0)
    }

    /// Makes every records snapshot write fail until
    /// [`unblock_snapshots`](Self::unblock_snapshots).
    ///
    /// The temporary file path is occupied by a non-empty directory, so the
    /// existing snapshot stays intact.
    pub fn block_snapshots(&self) {
        block(&self.records_path());
    }

    /// Makes only the index snapshot write fail.
    pub fn block_index_snapshots(&self) {
        block(&self.indexes_path());
    }

    /// Lets snapshot writes succeed again.
    pub fn unblock_snapshots(&self) {
        unblock(&self.records_path());
        unblock(&self.indexes_path());
    }

    fn open(&mut self) {
        self.engine = Some(self.open_engine().expect("Failed to open engine"));
    }

    fn open_engine(&self) -> contactdb_core::CoreResult<Engine> {
        match &self.faults {
            Some(faults) => {
                let inner = FileBackend::open_with_create_dirs(&self.wal_path())?;
                let backend = FaultyBackend::with_switch(Box::new(inner), faults.clone());
                Engine::open_with_wal_backend(self.path(), self.config.clone(), Box::new(backend))
            }
            None => Engine::open_with_config(self.path(), self.config.clone()),
        }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        self.engine()
    }
}

fn block(path: &Path) {
    let temp = temp_path_for(path);
    fs::create_dir_all(&temp).expect("Failed to create blocker");
    fs::write(temp.join("blocker"), b"x").expect("Failed to fill blocker");
}

fn unblock(path: &Path) {
    let temp = temp_path_for(path);
    if temp.is_dir() {
        fs::remove_dir_all(&temp).expect("Failed to remove blocker");
    }
}
