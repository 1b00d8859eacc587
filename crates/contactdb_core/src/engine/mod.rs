//! Engine facade and recovery.

mod recovery;
mod state;
mod verify;

pub use recovery::RecoveryReport;
pub use verify::VerifyReport;

use crate::config::Config;
use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult, IndexError};
use crate::record::{Record, RecordEdit};
use crate::snapshot::SnapshotManager;
use crate::types::RecordId;
use crate::wal::{WalEntry, WalManager};
use contactdb_storage::{FileBackend, StorageBackend};
use parking_lot::RwLock;
use state::EngineState;
use std::path::Path;
use tracing::{debug, info, warn};

/// A lookup against one of the indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Records whose name equals the key.
    Exact(String),
    /// Records whose name starts with the key.
    Prefix(String),
    /// Records whose phone number ends with the key.
    Suffix(String),
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Number of records.
    pub records: usize,
    /// Id the next added record will get.
    pub next_id: RecordId,
    /// Generation of the last snapshot written or loaded.
    pub generation: u64,
    /// Nodes in the name trie, root included.
    pub prefix_nodes: usize,
    /// Nodes in the phone trie, root included.
    pub suffix_nodes: usize,
    /// Current WAL size in bytes.
    pub wal_bytes: u64,
    /// Index warnings collected since open.
    pub index_warnings: usize,
}

/// The contact store.
///
/// `Engine` owns a locked data directory and keeps the records plus both
/// tries in memory. Every mutation runs as one sequence under the write
/// lock:
///
/// ```text
/// validate → append WAL entry (synced) → apply in memory
///          → write snapshot → truncate WAL
/// ```
///
/// Reads take the read lock, so they never see a half-applied mutation.
///
/// # Opening
///
/// ```rust,ignore
/// use contactdb_core::{Config, Engine};
/// use std::path::Path;
///
/// let config = Config::default().pretty_snapshots(false);
/// let engine = Engine::open_with_config(Path::new("contacts"), config)?;
/// println!("{} records", engine.stats()?.records);
/// ```
pub struct Engine {
    /// Configuration.
    config: Config,
    /// Data directory (holds the lock).
    dir: DataDir,
    /// WAL manager.
    wal: WalManager,
    /// Snapshot reader/writer.
    snapshots: SnapshotManager,
    /// Records and indexes.
    state: RwLock<EngineState>,
    /// Outcome of the recovery run during open.
    recovery: RecoveryReport,
}

impl Engine {
    /// Opens or creates an engine in `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another engine has the directory locked (`DatabaseLocked`)
    /// - The records snapshot is unreadable (`InvalidFormat`)
    /// - A complete WAL line is corrupt (`WalCorruption`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens an engine with custom configuration.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = DataDir::open(path, config.create_if_missing)?;
        let backend = FileBackend::open_with_create_dirs(&dir.wal_path())?;
        Self::open_in_dir(dir, config, Box::new(backend))
    }

    /// Opens an engine whose WAL lives in `wal_backend` instead of
    /// `wal.log`.
    ///
    /// Snapshots are still read from and written to `path`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_wal_backend(
        path: &Path,
        config: Config,
        wal_backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let dir = DataDir::open(path, config.create_if_missing)?;
        Self::open_in_dir(dir, config, wal_backend)
    }

    fn open_in_dir(
        dir: DataDir,
        config: Config,
        wal_backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let wal = WalManager::new(wal_backend, config.sync_on_append);
        let snapshots = SnapshotManager::new(&dir, &config);
        let (state, mut recovery) = recovery::recover(&snapshots, &wal)?;

        let mut engine = Self {
            config,
            dir,
            wal,
            snapshots,
            state: RwLock::new(state),
            recovery: RecoveryReport::default(),
        };

        if recovery.needs_checkpoint() {
            let mut state = engine.state.write();
            match engine.write_snapshot(&mut state) {
                Ok(()) => recovery.checkpointed = true,
                Err(err) => warn!(error = %err, "checkpoint after recovery failed, WAL kept"),
            }
        }

        info!(
            path = %engine.dir.path().display(),
            records = engine.state.read().records.len(),
            "engine opened"
        );

        engine.recovery = recovery;
        Ok(engine)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Adds a contact and returns its id.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateEntry`], [`CoreError::AmbiguousName`] or
    ///   [`CoreError::PhoneConflict`] if the contact is rejected
    /// - [`CoreError::WalWriteFailure`] if the entry could not be logged
    /// - [`CoreError::SnapshotWriteFailure`] if the contact was added but the
    ///   snapshot could not be written
    pub fn add(&self, name: &str, phone: &str, remark: &str) -> CoreResult<RecordId> {
        let mut state = self.state.write();
        state.records.check_add(name, phone, remark)?;

        let record = Record::new(state.records.next_id(), name, phone, remark);
        let id = record.id;
        self.wal.append(&WalEntry::add(&record))?;
        state.apply_add(record)?;
        debug!(%id, "contact added");

        self.persist(&mut state, id)?;
        Ok(id)
    }

    /// Deletes the first contact, in list order, named exactly `name`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if no contact has the name, otherwise as
    /// [`add`](Self::add).
    pub fn delete(&self, name: &str) -> CoreResult<Record> {
        let mut state = self.state.write();
        let target = state
            .records
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| CoreError::not_found(name))?;
        self.delete_record(&mut state, &target)
    }

    /// Deletes the contact with `id`.
    ///
    /// # Errors
    ///
    /// [`CoreError::RecordNotFound`] if no contact has the id, otherwise as
    /// [`add`](Self::add).
    pub fn delete_by_id(&self, id: RecordId) -> CoreResult<Record> {
        let mut state = self.state.write();
        let target = state
            .records
            .get(id)
            .cloned()
            .ok_or(CoreError::RecordNotFound { id })?;
        self.delete_record(&mut state, &target)
    }

    fn delete_record(&self, state: &mut EngineState, target: &Record) -> CoreResult<Record> {
        self.wal.append(&WalEntry::delete(target))?;
        let removed = state
            .apply_delete(target.id)
            .ok_or(CoreError::RecordNotFound { id: target.id })?;
        debug!(id = %removed.id, "contact deleted");

        self.persist(state, removed.id)?;
        Ok(removed)
    }

    /// Edits the first contact named `name` and returns the edited record.
    ///
    /// Fields absent from `edit` keep their value. An empty edit only checks
    /// that the contact exists and logs nothing.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no contact has the name
    /// - [`CoreError::AmbiguousName`] if renaming onto a taken name without a
    ///   new remark
    /// - [`CoreError::PhoneConflict`] if the new phone belongs to another
    ///   contact
    /// - [`CoreError::WalWriteFailure`] or [`CoreError::SnapshotWriteFailure`]
    ///   as for [`add`](Self::add)
    pub fn edit(&self, name: &str, edit: RecordEdit) -> CoreResult<Record> {
        let mut state = self.state.write();
        let target = state.records.check_edit(name, &edit)?.clone();
        self.edit_record(&mut state, target, &edit)
    }

    /// Edits the contact with `id`.
    ///
    /// # Errors
    ///
    /// As [`edit`](Self::edit), with [`CoreError::RecordNotFound`] for a
    /// missing id.
    pub fn edit_by_id(&self, id: RecordId, edit: RecordEdit) -> CoreResult<Record> {
        let mut state = self.state.write();
        let target = state.records.check_edit_by_id(id, &edit)?.clone();
        self.edit_record(&mut state, target, &edit)
    }

    fn edit_record(
        &self,
        state: &mut EngineState,
        target: Record,
        edit: &RecordEdit,
    ) -> CoreResult<Record> {
        if edit.is_empty() {
            return Ok(target);
        }

        self.wal.append(&WalEntry::edit(&target, edit))?;
        let edited = state
            .apply_edit(target.id, edit)
            .ok_or(CoreError::RecordNotFound { id: target.id })?;
        debug!(id = %edited.id, "contact edited");

        self.persist(state, edited.id)?;
        Ok(edited)
    }

    /// Sorts the list by the uppercase first letter of each name.
    ///
    /// Ids and indexes are untouched and nothing is logged; the new order
    /// is written with the next snapshot.
    pub fn sort_by_name_initial(&self) {
        self.state.write().records.sort_by_name_initial();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Runs `query` and returns the matching contacts in list order.
    ///
    /// Exact lookups scan the records, so a name too long to index is
    /// still found.
    #[must_use]
    pub fn search(&self, query: &SearchQuery) -> Vec<Record> {
        let state = self.state.read();
        match query {
            SearchQuery::Exact(name) => state.records.all_by_name(name).cloned().collect(),
            SearchQuery::Prefix(prefix) => state.records.select(&state.prefix.search(prefix)),
            SearchQuery::Suffix(suffix) => state.records.select(&state.suffix.search(suffix)),
        }
    }

    /// Returns the first contact named exactly `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Record> {
        self.state.read().records.find_by_name(name).cloned()
    }

    /// Returns contacts whose name starts with `prefix`.
    #[must_use]
    pub fn search_prefix(&self, prefix: &str) -> Vec<Record> {
        self.search(&SearchQuery::Prefix(prefix.to_owned()))
    }

    /// Returns contacts whose phone number ends with `suffix`.
    #[must_use]
    pub fn search_suffix(&self, suffix: &str) -> Vec<Record> {
        self.search(&SearchQuery::Suffix(suffix.to_owned()))
    }

    /// Returns the contact with `id`.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.state.read().records.get(id).cloned()
    }

    /// Returns all contacts in list order.
    #[must_use]
    pub fn list(&self) -> Vec<Record> {
        self.state.read().records.list().to_vec()
    }

    /// Returns the number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns true if there are no contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Writes a snapshot of the current state and clears the WAL.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written; the WAL is then
    /// left as it was.
    pub fn checkpoint(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        self.write_snapshot(&mut state)?;
        info!(generation = state.generation, "checkpoint complete");
        Ok(())
    }

    /// Rebuilds both tries from the records and persists them.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn rebuild_indexes(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        state.rebuild_indexes(self.config.max_key_chars);
        info!(records = state.records.len(), "indexes rebuilt");
        self.write_snapshot(&mut state)
    }

    /// Compares both tries with a rebuild from the records.
    #[must_use]
    pub fn verify_indexes(&self) -> VerifyReport {
        verify::verify(&self.state.read(), self.config.max_key_chars)
    }

    /// Keys that could not be indexed since the engine was opened.
    #[must_use]
    pub fn index_warnings(&self) -> Vec<IndexError> {
        self.state.read().index_warnings.clone()
    }

    /// Returns current counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL size cannot be read.
    pub fn stats(&self) -> CoreResult<EngineStats> {
        let state = self.state.read();
        Ok(EngineStats {
            records: state.records.len(),
            next_id: state.records.next_id(),
            generation: state.generation,
            prefix_nodes: state.prefix.node_count(),
            suffix_nodes: state.suffix.node_count(),
            wal_bytes: self.wal.size()?,
            index_warnings: state.index_warnings.len(),
        })
    }

    /// Returns the data directory path.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns what recovery did when this engine was opened.
    #[must_use]
    pub fn last_recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Snapshots after a mutation of `id`.
    fn persist(&self, state: &mut EngineState, id: RecordId) -> CoreResult<()> {
        self.write_snapshot(state).map_err(|err| {
            warn!(%id, error = %err, "snapshot write failed, change is only in the WAL");
            CoreError::snapshot_write_failure(id, err)
        })
    }

    /// Writes the next snapshot generation and truncates the WAL.
    fn write_snapshot(&self, state: &mut EngineState) -> CoreResult<()> {
        let generation = state.generation + 1;
        self.snapshots
            .write(&state.records, &state.prefix, &state.suffix, generation)?;
        state.generation = generation;

        // Entries left behind are skipped or reapplied in order on replay.
        if let Err(err) = self.wal.truncate() {
            warn!(error = %err, "WAL truncate after snapshot failed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Engine")
            .field("path", &self.dir.path())
            .field("records", &state.records.len())
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}
