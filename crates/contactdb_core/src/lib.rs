//! # ContactDB Core
//!
//! Persistence and indexing engine for a small contact store.
//!
//! This crate provides:
//! - [`RecordStore`]: ordered records with uniqueness rules
//! - [`PrefixIndex`] / [`SuffixIndex`]: character tries over names and phones
//! - [`WalManager`]: fsync'd JSON-lines write-ahead log
//! - [`SnapshotManager`]: atomic whole-state snapshots
//! - [`Engine`]: the composition root that ties them together
//!
//! Every mutation runs validate → log → apply → snapshot → truncate under
//! one write lock. On open, the latest snapshot is loaded and any logged
//! entries are replayed and checkpointed.
//!
//! ```rust,no_run
//! use contactdb_core::{Engine, RecordEdit, SearchQuery};
//! use std::path::Path;
//!
//! let engine = Engine::open(Path::new("data"))?;
//! let id = engine.add("Ann", "5551234", "")?;
//! engine.edit("Ann", RecordEdit::new().remark("work"))?;
//! let hits = engine.search(&SearchQuery::Suffix("1234".into()));
//! assert_eq!(hits[0].id, id);
//! # Ok::<(), contactdb_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod engine;
mod error;
pub mod index;
pub mod record;
mod snapshot;
mod types;
pub mod wal;

pub use config::Config;
pub use dir::DataDir;
pub use engine::{Engine, EngineStats, RecoveryReport, SearchQuery, VerifyReport};
pub use error::{CoreError, CoreResult, IndexError};
pub use index::{PrefixIndex, SuffixIndex};
pub use record::{Record, RecordEdit, RecordStore};
pub use snapshot::{LoadedSnapshot, SnapshotManager};
pub use types::RecordId;
pub use wal::{WalContents, WalEntry, WalManager};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
