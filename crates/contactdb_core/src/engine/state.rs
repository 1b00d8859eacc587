//! In-memory state guarded by the engine lock.

use crate::error::{CoreResult, IndexError};
use crate::index::{build_indexes, PrefixIndex, SuffixIndex};
use crate::record::{Record, RecordEdit, RecordStore};
use crate::snapshot::LoadedSnapshot;
use crate::types::RecordId;
use crate::wal::WalEntry;
use tracing::{debug, warn};

/// Records, both tries, and the snapshot generation they were last
/// written under.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) records: RecordStore,
    pub(crate) prefix: PrefixIndex,
    pub(crate) suffix: SuffixIndex,
    pub(crate) generation: u64,
    pub(crate) index_warnings: Vec<IndexError>,
}

impl EngineState {
    pub(crate) fn from_snapshot(loaded: LoadedSnapshot) -> Self {
        for err in &loaded.index_errors {
            warn!(error = %err, "key not indexed");
        }
        Self {
            records: loaded.records,
            prefix: loaded.prefix,
            suffix: loaded.suffix,
            generation: loaded.generation,
            index_warnings: loaded.index_errors,
        }
    }

    /// Inserts a validated record and indexes it.
    pub(crate) fn apply_add(&mut self, record: Record) -> CoreResult<()> {
        let (id, name, phone) = (record.id, record.name.clone(), record.phone.clone());
        self.records.insert(record)?;
        self.index_name(&name, id);
        self.index_phone(&phone, id);
        Ok(())
    }

    /// Removes the record with `id` from the store and both tries.
    pub(crate) fn apply_delete(&mut self, id: RecordId) -> Option<Record> {
        let record = self.records.remove_by_id(id)?;
        self.unindex_name(&record.name, id);
        self.unindex_phone(&record.phone, id);
        Some(record)
    }

    /// Applies `edit` to the record with `id`, moving index entries for any
    /// key that changed. Returns the edited record.
    pub(crate) fn apply_edit(&mut self, id: RecordId, edit: &RecordEdit) -> Option<Record> {
        let (before, after) = self.records.apply_edit_by_id(id, edit)?;
        if before.name != after.name {
            self.unindex_name(&before.name, id);
            self.index_name(&after.name, id);
        }
        if before.phone != after.phone {
            self.unindex_phone(&before.phone, id);
            self.index_phone(&after.phone, id);
        }
        Some(after)
    }

    /// Applies a logged entry during replay.
    ///
    /// Entries are keyed by id: an add whose id is present, or a delete or
    /// edit whose id is absent, is skipped. Returns true if state changed.
    ///
    /// Fails only for an add whose id leaves the counter nowhere to go.
    pub(crate) fn replay_entry(&mut self, entry: &WalEntry) -> CoreResult<bool> {
        match entry {
            WalEntry::Add {
                id,
                name,
                phone_number,
                remark,
            } => {
                let record = Record::new(*id, name, phone_number, remark);
                if !self.records.insert_if_absent(record)? {
                    return Ok(false);
                }
                self.index_name(name, *id);
                self.index_phone(phone_number, *id);
                Ok(true)
            }
            WalEntry::Delete { id, .. } => Ok(self.apply_delete(*id).is_some()),
            WalEntry::Edit { id, .. } => Ok(match entry.as_edit() {
                Some(edit) => self.apply_edit(*id, &edit).is_some(),
                None => false,
            }),
        }
    }

    /// Discards both tries and indexes every record again.
    pub(crate) fn rebuild_indexes(&mut self, max_key_chars: usize) {
        let (prefix, suffix, errors) = build_indexes(self.records.list(), max_key_chars);
        self.prefix = prefix;
        self.suffix = suffix;
        for err in &errors {
            warn!(error = %err, "key not indexed");
        }
        self.index_warnings = errors;
    }

    fn index_name(&mut self, name: &str, id: RecordId) {
        if let Err(err) = self.prefix.insert(name, id) {
            self.record_warning(err);
        }
    }

    fn index_phone(&mut self, phone: &str, id: RecordId) {
        if let Err(err) = self.suffix.insert(phone, id) {
            self.record_warning(err);
        }
    }

    // A key the trie rejects on delete was rejected on insert too, so there
    // is nothing to remove.
    fn unindex_name(&mut self, name: &str, id: RecordId) {
        if let Err(err) = self.prefix.delete(name, id) {
            debug!(error = %err, "name was not indexed");
        }
    }

    fn unindex_phone(&mut self, phone: &str, id: RecordId) {
        if let Err(err) = self.suffix.delete(phone, id) {
            debug!(error = %err, "phone was not indexed");
        }
    }

    fn record_warning(&mut self, err: IndexError) {
        warn!(error = %err, "key not indexed");
        self.index_warnings.push(err);
    }
}
