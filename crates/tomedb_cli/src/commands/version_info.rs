//! Version-info command implementation.

use std::path::Path;
use tomedb_core::VersionController;

/// Runs the version-info command.
pub fn run(versions_dir: &Path, name: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let controller = VersionController::new(versions_dir);
    let metadata = controller.metadata(name)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        _ => {
            println!("Version: {name}");
            println!("  Created:  {}", metadata.timestamp.to_rfc3339());
            if let Some(source) = &metadata.created_from {
                println!("  From:     {source}");
            }
            println!("  Records:  {}", metadata.total_records);
            println!("  Chunks:   {}", metadata.chunks);
            if let Some(last_id) = metadata.last_id {
                println!("  Last id:  {last_id}");
            }
        }
    }
    Ok(())
}
