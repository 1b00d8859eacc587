//! Inspect command implementation.

use contactdb_core::{Config, DataDir, SnapshotManager, WalManager};
use contactdb_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Data directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory path.
    pub path: String,
    /// Records snapshot size in bytes.
    pub records_size: u64,
    /// Index snapshot size in bytes.
    pub indexes_size: u64,
    /// WAL file size in bytes.
    pub wal_size: u64,
    /// Snapshot generation.
    pub generation: u64,
    /// Number of records in the snapshot.
    pub record_count: usize,
    /// Id the next added record will get.
    pub next_id: u64,
    /// Whether the index snapshot is usable as is.
    pub indexes_current: bool,
    /// Number of complete WAL entries waiting to be replayed.
    pub wal_entry_count: usize,
    /// Bytes of an unfinished WAL append.
    pub wal_torn_bytes: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Reads the files under the directory lock without replaying the WAL.
pub(crate) fn collect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let dir = DataDir::open(path, false)?;
    let snapshots = SnapshotManager::new(&dir, &Config::default());
    let loaded = snapshots.load()?;

    let mut result = InspectResult {
        path: path.display().to_string(),
        records_size: file_size(&dir.records_path()),
        indexes_size: file_size(&dir.indexes_path()),
        wal_size: 0,
        generation: loaded.generation,
        record_count: loaded.records.len(),
        next_id: loaded.records.next_id().as_u64(),
        indexes_current: !loaded.indexes_rebuilt,
        wal_entry_count: 0,
        wal_torn_bytes: 0,
    };

    let wal_path = dir.wal_path();
    if wal_path.exists() {
        let backend = FileBackend::open(&wal_path)?;
        result.wal_size = backend.size()?;
        let contents = WalManager::new(Box::new(backend), false).read()?;
        result.wal_entry_count = contents.entries.len();
        result.wal_torn_bytes = contents.torn_bytes;
    }

    Ok(result)
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn print_text_output(result: &InspectResult) {
    println!("ContactDB Inspection");
    println!("====================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  Records snapshot: {}", format_size(result.records_size));
    println!("  Index snapshot:   {}", format_size(result.indexes_size));
    println!("  WAL:              {}", format_size(result.wal_size));
    println!();
    println!("Snapshot:");
    println!("  Generation:     {}", result.generation);
    println!("  Records:        {}", result.record_count);
    println!("  Next id:        {}", result.next_id);
    println!(
        "  Indexes:        {}",
        if result.indexes_current {
            "current"
        } else {
            "stale (rebuilt on open)"
        }
    );
    println!();
    println!("WAL:");
    println!("  Pending entries: {}", result.wal_entry_count);
    if result.wal_torn_bytes > 0 {
        println!("  Torn tail:       {} bytes", result.wal_torn_bytes);
    }
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactdb_core::{Engine, Record, RecordId, WalEntry};
    use tempfile::tempdir;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn collect_reads_without_replaying() {
        let dir = tempdir().unwrap();
        {
            let engine = Engine::open(dir.path()).unwrap();
            engine.add("Ann", "111", "").unwrap();
            engine.add("Bob", "222", "").unwrap();
        }
        let backend = FileBackend::open(&dir.path().join("wal.log")).unwrap();
        let record = Record::new(RecordId::new(3), "Cy", "333", "");
        WalManager::new(Box::new(backend), true)
            .append(&WalEntry::add(&record))
            .unwrap();

        let result = collect(dir.path()).unwrap();
        assert_eq!(result.record_count, 2);
        assert_eq!(result.generation, 2);
        assert_eq!(result.next_id, 3);
        assert!(result.indexes_current);
        assert_eq!(result.wal_entry_count, 1);
        assert!(result.records_size > 0);

        let again = collect(dir.path()).unwrap();
        assert_eq!(again.wal_entry_count, 1);
    }

    #[test]
    fn collect_refuses_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(collect(&dir.path().join("absent")).is_err());
    }
}
