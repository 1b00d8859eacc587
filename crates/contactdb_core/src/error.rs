//! Error types for ContactDB core.

use crate::types::RecordId;
use contactdb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ContactDB core operations.
///
/// The first four variants are validation failures: they are raised before
/// anything is logged or changed. [`CoreError::WalWriteFailure`] also leaves
/// state untouched. [`CoreError::SnapshotWriteFailure`] is the one case where
/// memory has already changed; see [`CoreError::is_persistence_pending`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record with the same name and phone already exists.
    #[error("duplicate entry: a contact named {name:?} with phone {phone:?} already exists")]
    DuplicateEntry {
        /// The rejected name.
        name: String,
        /// The rejected phone number.
        phone: String,
    },

    /// The name is taken and no remark was given to tell the records apart.
    #[error("ambiguous name: {name:?} already exists, a remark is required to distinguish it")]
    AmbiguousName {
        /// The conflicting name.
        name: String,
    },

    /// The phone number belongs to another record.
    #[error("phone conflict: {phone:?} is already used by {owner:?}")]
    PhoneConflict {
        /// The conflicting phone number.
        phone: String,
        /// Name of the record that owns the number.
        owner: String,
    },

    /// No record has the given name.
    #[error("contact not found: {name:?}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// No record has the given id.
    #[error("contact not found: {id}")]
    RecordNotFound {
        /// The id that was looked up.
        id: RecordId,
    },

    /// The WAL entry could not be made durable; nothing was changed.
    #[error("WAL write failed, operation aborted: {source}")]
    WalWriteFailure {
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// Memory and the WAL reflect the change but the snapshot does not.
    #[error("snapshot write failed after changing {id}; persistence is pending: {source}")]
    SnapshotWriteFailure {
        /// The record the mutation touched.
        id: RecordId,
        /// Underlying failure.
        #[source]
        source: Box<CoreError>,
    },

    /// A complete WAL line could not be decoded.
    #[error("WAL corruption at line {line}: {message}")]
    WalCorruption {
        /// One-based line number in the log.
        line: usize,
        /// Description of the corruption.
        message: String,
    },

    /// A snapshot artifact has an unexpected shape.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Every record id has been handed out.
    #[error("record ids exhausted: counter reached {last}")]
    IdsExhausted {
        /// The counter value, which has no successor.
        last: RecordId,
    },

    /// Another engine holds the data directory lock.
    #[error("data directory locked: another process has exclusive access")]
    DatabaseLocked,

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a duplicate entry error.
    pub fn duplicate_entry(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self::DuplicateEntry {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// Creates an ambiguous name error.
    pub fn ambiguous_name(name: impl Into<String>) -> Self {
        Self::AmbiguousName { name: name.into() }
    }

    /// Creates a phone conflict error.
    pub fn phone_conflict(phone: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::PhoneConflict {
            phone: phone.into(),
            owner: owner.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a snapshot write failure for a mutation of `id`.
    pub fn snapshot_write_failure(id: RecordId, source: CoreError) -> Self {
        Self::SnapshotWriteFailure {
            id,
            source: Box::new(source),
        }
    }

    /// Creates a WAL corruption error.
    pub fn wal_corruption(line: usize, message: impl Into<String>) -> Self {
        Self::WalCorruption {
            line,
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for errors raised before any state change because the
    /// request itself was rejected.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEntry { .. }
                | Self::AmbiguousName { .. }
                | Self::PhoneConflict { .. }
                | Self::NotFound { .. }
                | Self::RecordNotFound { .. }
                | Self::IdsExhausted { .. }
        )
    }

    /// Returns true if the change is applied in memory and logged, but not
    /// yet captured by a durable snapshot.
    #[must_use]
    pub fn is_persistence_pending(&self) -> bool {
        matches!(self, Self::SnapshotWriteFailure { .. })
    }
}

/// Non-fatal index maintenance failures.
///
/// These never abort a record mutation; the engine logs them and keeps them
/// in [`Engine::index_warnings`](crate::Engine::index_warnings).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// The key exceeds the configured maximum length and was not indexed.
    #[error("{index} index: key for {id} has {chars} characters, limit is {max}")]
    KeyTooLong {
        /// Which index rejected the key.
        index: &'static str,
        /// The record the key belongs to.
        id: RecordId,
        /// Length of the rejected key in characters.
        chars: usize,
        /// Configured limit.
        max: usize,
    },
}

impl IndexError {
    /// The record whose key was rejected.
    #[must_use]
    pub fn id(&self) -> RecordId {
        match self {
            Self::KeyTooLong { id, .. } => *id,
        }
    }
}
