//! Snapshot command implementation.

use std::path::Path;
use tomedb_core::{Database, VersionController, DEFAULT_SNAPSHOT_CHUNK_SIZE};
use tracing::info;

/// Runs the snapshot command.
///
/// With `empty` set, creates a version with no records and requires no
/// engine; otherwise opens the engine at `path` and snapshots its record
/// set.
pub fn run(
    versions_dir: &Path,
    name: &str,
    path: Option<&Path>,
    key: &str,
    chunk_size: Option<usize>,
    empty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = VersionController::new(versions_dir);

    if empty {
        controller.create_empty_version(name)?;
        info!(version = name, "created empty version");
        println!("Created empty version '{name}'");
        return Ok(());
    }

    let path = path.ok_or("Data directory path required for snapshot")?;
    info!(path = %path.display(), "opening engine for snapshot");
    let db = Database::open(path, key)?;
    let chunk_size = chunk_size.unwrap_or(DEFAULT_SNAPSHOT_CHUNK_SIZE);
    controller.create_version_with_chunk_size(&db, name, chunk_size)?;
    info!(version = name, records = db.len(), "snapshot complete");

    println!("Created version '{name}' with {} records", db.len());
    Ok(())
}
