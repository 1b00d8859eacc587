//! CLI command implementations.

pub mod checkpoint;
pub mod dump_wal;
pub mod inspect;
pub mod list;
pub mod verify;

use contactdb_core::{Config, Engine};
use std::path::Path;

/// Opens an existing data directory. Never creates one.
pub(crate) fn open_existing(path: &Path) -> Result<Engine, Box<dyn std::error::Error>> {
    let config = Config::default().create_if_missing(false);
    Ok(Engine::open_with_config(path, config)?)
}
