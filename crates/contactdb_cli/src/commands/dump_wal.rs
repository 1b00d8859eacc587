//! Dump WAL command implementation.

use contactdb_core::{DataDir, WalEntry, WalManager};
use contactdb_storage::FileBackend;
use std::path::Path;

/// Runs the dump-wal command.
///
/// The engine is not opened, since opening would replay and clear the log.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dir = DataDir::open(path, false)?;
    let wal_path = dir.wal_path();

    if !wal_path.exists() {
        return Err("WAL file not found".into());
    }

    let backend = FileBackend::open(&wal_path)?;
    let contents = WalManager::new(Box::new(backend), false).read()?;
    let entries: Vec<&WalEntry> = contents
        .entries
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            for (index, entry) in entries.iter().enumerate() {
                println!("{:>5}  {}", index + 1, describe(entry));
            }
            println!();
            println!("Total: {} entries", contents.entries.len());
            if contents.torn_bytes > 0 {
                println!("Torn tail: {} bytes", contents.torn_bytes);
            }
        }
    }

    Ok(())
}

fn describe(entry: &WalEntry) -> String {
    match entry {
        WalEntry::Add {
            id,
            name,
            phone_number,
            remark,
        } => {
            if remark.is_empty() {
                format!("ADD     {id} {name:?} {phone_number:?}")
            } else {
                format!("ADD     {id} {name:?} {phone_number:?} ({remark})")
            }
        }
        WalEntry::Delete { id, name } => format!("DELETE  {id} {name:?}"),
        WalEntry::Edit {
            id,
            name,
            new_name,
            new_phone,
            new_remark,
        } => {
            let mut changes = Vec::new();
            if let Some(v) = new_name {
                changes.push(format!("name={v:?}"));
            }
            if let Some(v) = new_phone {
                changes.push(format!("phone={v:?}"));
            }
            if let Some(v) = new_remark {
                changes.push(format!("remark={v:?}"));
            }
            format!("EDIT    {id} {name:?} {}", changes.join(" "))
        }
    }
}
