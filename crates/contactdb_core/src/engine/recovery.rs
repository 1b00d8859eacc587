//! Startup recovery.
//!
//! ```text
//! 1. load snapshot (rebuild indexes if stale)
//! 2. id counter = max(persisted next_id, max id + 1)
//! 3. replay the WAL by id, skipping entries already reflected
//! 4. checkpoint if the WAL held anything
//! ```
//!
//! Step 4 is driven by the engine once it owns the recovered state.

use super::state::EngineState;
use crate::error::CoreResult;
use crate::snapshot::SnapshotManager;
use crate::wal::WalManager;
use tracing::{debug, info, warn};

/// What happened while opening the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Generation of the snapshot that was loaded, 0 if none.
    pub snapshot_generation: u64,
    /// Records found in the snapshot.
    pub records_loaded: usize,
    /// True if the index snapshot was missing, stale, or corrupt.
    pub indexes_rebuilt: bool,
    /// Complete entries found in the WAL.
    pub wal_entries: usize,
    /// Entries that changed state when replayed.
    pub replayed: usize,
    /// Entries already reflected by the snapshot.
    pub skipped: usize,
    /// Bytes of an unfinished append discarded from the end of the WAL.
    pub torn_bytes: usize,
    /// True if a snapshot was written and the WAL cleared during open.
    pub checkpointed: bool,
}

impl RecoveryReport {
    /// True if the WAL held anything that a checkpoint should absorb.
    #[must_use]
    pub fn needs_checkpoint(&self) -> bool {
        self.wal_entries > 0
    }
}

/// Runs steps 1 to 3.
pub(crate) fn recover(
    snapshots: &SnapshotManager,
    wal: &WalManager,
) -> CoreResult<(EngineState, RecoveryReport)> {
    let loaded = snapshots.load()?;
    let mut report = RecoveryReport {
        snapshot_generation: loaded.generation,
        records_loaded: loaded.records.len(),
        indexes_rebuilt: loaded.indexes_rebuilt,
        ..RecoveryReport::default()
    };
    let mut state = EngineState::from_snapshot(loaded);

    let contents = wal.read()?;
    report.wal_entries = contents.entries.len();
    report.torn_bytes = contents.torn_bytes;

    if contents.torn_bytes > 0 {
        warn!(bytes = contents.torn_bytes, "discarding torn WAL tail");
        if let Err(err) = wal.discard_tail(contents.torn_bytes) {
            warn!(error = %err, "could not discard torn WAL tail");
        }
    }

    for entry in &contents.entries {
        if state.replay_entry(entry)? {
            report.replayed += 1;
        } else {
            debug!(op = entry.op(), id = %entry.id(), "WAL entry already applied");
            report.skipped += 1;
        }
    }

    info!(
        generation = report.snapshot_generation,
        records = state.records.len(),
        replayed = report.replayed,
        skipped = report.skipped,
        "recovery complete"
    );

    Ok((state, report))
}
