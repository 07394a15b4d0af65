//! Versions command implementation.

use std::path::Path;
use tomedb_core::VersionController;

/// Runs the versions command.
pub fn run(versions_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let controller = VersionController::new(versions_dir);
    let names = controller.list_versions()?;

    if names.is_empty() {
        println!("No versions found at {}", versions_dir.display());
        return Ok(());
    }

    for name in names {
        println!("{name}");
    }
    Ok(())
}
