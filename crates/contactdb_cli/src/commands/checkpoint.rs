//! Checkpoint command implementation.

use super::inspect::format_size;
use super::open_existing;
use std::path::Path;
use tracing::info;

/// Runs the checkpoint command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Checkpointing {:?}", path);

    let engine = open_existing(path)?;
    let recovery = engine.last_recovery().clone();
    engine.checkpoint()?;
    let stats = engine.stats()?;

    println!("Checkpoint complete");
    println!("  Replayed entries: {}", recovery.replayed);
    println!("  Records:          {}", stats.records);
    println!("  Generation:       {}", stats.generation);
    println!("  WAL size:         {}", format_size(stats.wal_bytes));

    Ok(())
}
