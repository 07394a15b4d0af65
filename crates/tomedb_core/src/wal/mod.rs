//! Append-only persistence: log entries and chunk-rotated files.

mod chunks;
mod entry;

pub use chunks::{chunk_files, ChunkLog};
pub use entry::LogEntry;
