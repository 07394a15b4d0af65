//! Delete-version command implementation.

use std::path::Path;
use tomedb_core::VersionController;

/// Runs the delete-version command.
pub fn run(versions_dir: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let controller = VersionController::new(versions_dir);

    if controller.delete_version(name)? {
        println!("Deleted version '{name}'");
    } else {
        println!("Version '{name}' not found");
    }
    Ok(())
}
