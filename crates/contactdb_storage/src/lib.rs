//! # ContactDB Storage
//!
//! Lowest-level storage layer for ContactDB.
//!
//! Backends are **opaque byte stores**: they append, read back, sync and
//! truncate bytes without interpreting them. The WAL line format and the
//! snapshot documents are owned by `contactdb_core`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral logs
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! Whole-file artifacts (snapshots) are not appended to; they are replaced
//! with [`write_atomic`], which never leaves a partially written file at
//! the canonical path.
//!
//! ## Example
//!
//! ```rust
//! use contactdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"{\"op\":\"add\"}\n").unwrap();
//! backend.sync().unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"{\"op\":\"add\"}\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod backend;
mod error;
mod file;
mod memory;

pub use atomic::{read_optional, sync_dir, temp_path_for, write_atomic};
pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
