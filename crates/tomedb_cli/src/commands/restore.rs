//! Restore command implementation.

use std::path::Path;
use tomedb_core::{Config, VersionController};
use tracing::info;

/// Runs the restore command.
///
/// The restored engine is opened once to replay the copied chunks and
/// report the record count, then closed so the target directory is free
/// for a regular open.
pub fn run(
    versions_dir: &Path,
    name: &str,
    target: &Path,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = VersionController::new(versions_dir);
    let mut config = Config::default();
    if !key.is_empty() {
        config = config.api_key(key);
    }

    info!(version = name, target = %target.display(), "restoring version");
    let db = controller.load_version(name, target, key, config)?;
    info!(records = db.len(), "restore complete");
    println!(
        "Restored version '{name}' into {} ({} records)",
        target.display(),
        db.len()
    );
    Ok(())
}
