//! Whole-state snapshots.
//!
//! Two files are written per snapshot, each with write-then-rename:
//!
//! - `contacts.json`: `{"generation": n, "next_id": m, "contacts": [...]}`
//! - `indexes.cbor`: both tries, tagged with the same generation
//!
//! The records file is the source of truth. The records file is always
//! written first, so a crash between the two renames leaves an index file
//! with an older generation, which is detected and rebuilt on load.

use crate::config::Config;
use crate::dir::DataDir;
use crate::error::{CoreError, CoreResult, IndexError};
use crate::index::{build_indexes, decode_indexes, encode_indexes, PrefixIndex, SuffixIndex};
use crate::record::{Record, RecordStore};
use crate::types::RecordId;
use contactdb_storage::{read_optional, write_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Records document as written.
#[derive(Serialize)]
struct RecordsFileRef<'a> {
    generation: u64,
    next_id: RecordId,
    contacts: &'a [Record],
}

/// Records document as read.
#[derive(Deserialize)]
struct RecordsFile {
    #[serde(default)]
    generation: u64,
    #[serde(default)]
    next_id: Option<RecordId>,
    #[serde(default)]
    contacts: Vec<Record>,
}

/// Accepted shapes of `contacts.json`.
///
/// A bare array is the layout used before generations and the id counter
/// were stored; it loads as generation 0.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsDocument {
    Current(RecordsFile),
    Bare(Vec<Record>),
}

/// State restored by [`SnapshotManager::load`].
#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    /// Records and id counter.
    pub records: RecordStore,
    /// Name trie.
    pub prefix: PrefixIndex,
    /// Phone trie.
    pub suffix: SuffixIndex,
    /// Generation of the records file, 0 if none existed.
    pub generation: u64,
    /// True if the indexes were rebuilt from the records instead of loaded.
    pub indexes_rebuilt: bool,
    /// Keys rejected while rebuilding.
    pub index_errors: Vec<IndexError>,
}

/// Reads and writes snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    records_path: PathBuf,
    indexes_path: PathBuf,
    pretty: bool,
    persist_indexes: bool,
    max_key_chars: usize,
}

impl SnapshotManager {
    /// Creates a manager for the snapshot files of `dir`.
    #[must_use]
    pub fn new(dir: &DataDir, config: &Config) -> Self {
        Self::with_paths(dir.records_path(), dir.indexes_path(), config)
    }

    /// Creates a manager for explicit file paths.
    #[must_use]
    pub fn with_paths(records_path: PathBuf, indexes_path: PathBuf, config: &Config) -> Self {
        Self {
            records_path,
            indexes_path,
            pretty: config.pretty_snapshots,
            persist_indexes: config.persist_indexes,
            max_key_chars: config.max_key_chars,
        }
    }

    /// Path of the records file.
    #[must_use]
    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Path of the index file.
    #[must_use]
    pub fn indexes_path(&self) -> &Path {
        &self.indexes_path
    }

    /// Durably replaces the snapshot with the given state.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any atomic write fails. The records
    /// file may already be replaced when the index write fails; the next
    /// load detects the generation mismatch.
    pub fn write(
        &self,
        records: &RecordStore,
        prefix: &PrefixIndex,
        suffix: &SuffixIndex,
        generation: u64,
    ) -> CoreResult<()> {
        let doc = RecordsFileRef {
            generation,
            next_id: records.next_id(),
            contacts: records.list(),
        };
        let data = if self.pretty {
            serde_json::to_vec_pretty(&doc)?
        } else {
            serde_json::to_vec(&doc)?
        };
        write_atomic(&self.records_path, &data)?;

        if self.persist_indexes {
            let data = encode_indexes(generation, prefix, suffix)?;
            write_atomic(&self.indexes_path, &data)?;
        }

        debug!(generation, records = records.len(), "snapshot written");
        Ok(())
    }

    /// Loads the latest snapshot.
    ///
    /// Missing files yield an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the records file cannot be
    /// parsed or holds two records with the same id. Problems with the
    /// index file are never errors.
    pub fn load(&self) -> CoreResult<LoadedSnapshot> {
        let data = match read_optional(&self.records_path)? {
            Some(data) if !data.is_empty() => data,
            _ => {
                return Ok(LoadedSnapshot {
                    prefix: PrefixIndex::with_max_key_chars(self.max_key_chars),
                    suffix: SuffixIndex::with_max_key_chars(self.max_key_chars),
                    ..LoadedSnapshot::default()
                })
            }
        };

        let file = decode_records(&data)?;
        let generation = file.generation;
        let records = RecordStore::from_records(file.contacts, file.next_id)?;

        let mut loaded = LoadedSnapshot {
            records,
            generation,
            ..LoadedSnapshot::default()
        };

        match self.load_indexes(generation) {
            Some((prefix, suffix)) => {
                loaded.prefix = prefix;
                loaded.suffix = suffix;
            }
            None => {
                let (prefix, suffix, errors) =
                    build_indexes(loaded.records.list(), self.max_key_chars);
                loaded.prefix = prefix;
                loaded.suffix = suffix;
                loaded.index_errors = errors;
                loaded.indexes_rebuilt = true;
            }
        }

        Ok(loaded)
    }

    /// Returns the persisted indexes if they are present, decodable, and
    /// from `generation`.
    fn load_indexes(&self, generation: u64) -> Option<(PrefixIndex, SuffixIndex)> {
        if !self.persist_indexes {
            debug!("index persistence disabled, rebuilding indexes");
            return None;
        }

        let data = match read_optional(&self.indexes_path) {
            Ok(Some(data)) => data,
            Ok(None) => {
                warn!(path = %self.indexes_path.display(), "index snapshot missing, rebuilding");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "index snapshot unreadable, rebuilding");
                return None;
            }
        };

        match decode_indexes(&data, self.max_key_chars) {
            Ok(decoded) if decoded.generation == generation => {
                Some((decoded.prefix, decoded.suffix))
            }
            Ok(decoded) => {
                warn!(
                    index_generation = decoded.generation,
                    records_generation = generation,
                    "index snapshot is stale, rebuilding"
                );
                None
            }
            Err(err) => {
                warn!(error = %err, "index snapshot corrupt, rebuilding");
                None
            }
        }
    }
}

fn decode_records(data: &[u8]) -> CoreResult<RecordsFile> {
    let doc: RecordsDocument = serde_json::from_slice(data)
        .map_err(|e| CoreError::invalid_format(format!("records snapshot: {e}")))?;

    let file = match doc {
        RecordsDocument::Current(file) => file,
        RecordsDocument::Bare(contacts) => RecordsFile {
            generation: 0,
            next_id: None,
            contacts,
        },
    };

    let mut seen = BTreeSet::new();
    for record in &file.contacts {
        if !seen.insert(record.id) {
            return Err(CoreError::invalid_format(format!(
                "records snapshot: {} appears more than once",
                record.id
            )));
        }
    }

    Ok(file)
}
