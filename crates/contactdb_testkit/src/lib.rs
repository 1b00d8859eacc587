//! # ContactDB Testkit
//!
//! Test utilities for ContactDB.
//!
//! This crate provides:
//! - [`FaultyBackend`]: a WAL backend whose appends and syncs can be made
//!   to fail on demand
//! - [`TestStore`]: an engine in a temporary directory that can be
//!   crashed, reopened, and have its snapshot writes blocked
//! - proptest strategies for contacts and operation sequences
//!
//! The cross-crate recovery and failure tests live in `tests/`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contactdb_testkit::prelude::*;
//!
//! let mut store = TestStore::new();
//! store.engine().add("Ann", "111", "").unwrap();
//! store.reopen();
//! assert_eq!(store.engine().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fault::{FaultSwitch, FaultyBackend};
pub use fixtures::TestStore;
