//! Verify command implementation.

use super::open_existing;
use contactdb_core::VerifyReport;
use std::path::Path;

/// Runs the verify command.
///
/// Fails if the indexes disagree with the records and `repair` is not set.
pub fn run(path: &Path, repair: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying data directory at {:?}", path);
    println!();

    let engine = open_existing(path)?;
    let recovery = engine.last_recovery();
    if recovery.indexes_rebuilt {
        println!("Index snapshot was stale and has been rebuilt in memory");
    }
    if recovery.replayed > 0 {
        println!("Replayed {} WAL entries", recovery.replayed);
    }

    let report = engine.verify_indexes();
    print_report(&report);

    for warning in engine.index_warnings() {
        println!("  warning: {warning}");
    }

    println!();
    if report.is_consistent() {
        println!("✓ Verification passed");
        return Ok(());
    }

    if repair {
        engine.rebuild_indexes()?;
        let after = engine.verify_indexes();
        if after.is_consistent() {
            println!("✓ Indexes rebuilt and saved");
            return Ok(());
        }
    }

    println!("✗ Verification failed");
    Err("Verification failed".into())
}

fn print_report(report: &VerifyReport) {
    println!("Records checked: {}", report.records);
    println!(
        "  Name index:  {}",
        if report.prefix_consistent { "ok" } else { "MISMATCH" }
    );
    println!(
        "  Phone index: {}",
        if report.suffix_consistent { "ok" } else { "MISMATCH" }
    );
    if !report.unindexed.is_empty() {
        println!("  Not indexed: {}", join_ids(&report.unindexed));
    }
    if !report.dangling.is_empty() {
        println!("  Dangling:    {}", join_ids(&report.dangling));
    }
}

fn join_ids(ids: &[contactdb_core::RecordId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
