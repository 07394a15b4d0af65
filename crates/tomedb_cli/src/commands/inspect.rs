//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use tomedb_core::{chunk_files, Database};

/// Engine inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory path.
    pub path: String,
    /// Number of live records after replay.
    pub record_count: usize,
    /// Highest assigned record id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u64>,
    /// Next id that would be assigned.
    pub next_id: u64,
    /// Number of distinct indexed top-level field names.
    pub indexed_fields: usize,
    /// Number of log chunk files.
    pub chunk_count: usize,
    /// Total size of all chunk files in bytes.
    pub log_size: u64,
    /// Per-chunk sizes, keyed by chunk index.
    pub chunks: Vec<ChunkStats>,
}

/// Statistics for a single log chunk.
#[derive(Debug, Serialize)]
pub struct ChunkStats {
    /// Chunk index.
    pub index: u64,
    /// File size in bytes.
    pub size: u64,
}

/// Runs the inspect command.
///
/// Opens the engine (replaying the full log) and reports live state plus
/// on-disk chunk statistics.
pub fn run(path: &Path, key: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(path, key)?;

    let mut chunks = Vec::new();
    let mut log_size = 0;
    for (index, file) in chunk_files(path, &db.config().base_name)? {
        let size = std::fs::metadata(&file)?.len();
        log_size += size;
        chunks.push(ChunkStats { index, size });
    }

    let result = InspectResult {
        path: path.display().to_string(),
        record_count: db.len(),
        last_id: db.last_id().map(|id| id.as_u64()),
        next_id: db.next_id(),
        indexed_fields: db.indexed_field_count(),
        chunk_count: chunks.len(),
        log_size,
        chunks,
    };

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

fn print_text_output(result: &InspectResult) {
    println!("TomeDB Data Directory Inspection");
    println!("================================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Records:");
    println!("  Live records: {}", result.record_count);
    match result.last_id {
        Some(id) => println!("  Last id:      {id}"),
        None => println!("  Last id:      (none)"),
    }
    println!("  Next id:      {}", result.next_id);
    println!();
    println!("Indexes:");
    println!("  Indexed fields: {}", result.indexed_fields);
    println!();
    println!("Log:");
    println!("  Chunks:     {}", result.chunk_count);
    println!("  Total size: {}", format_size(result.log_size));
    for chunk in &result.chunks {
        println!("    [{}] {}", chunk.index, format_size(chunk.size));
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
