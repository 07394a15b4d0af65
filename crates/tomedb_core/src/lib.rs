//! # TomeDB Core
//!
//! Embedded, schema-less, versioned JSON document store.
//!
//! This crate provides:
//! - An append-only operation log split across rotating chunk files
//! - An in-memory record map rebuilt by replaying the log on open
//! - Secondary hash indexes over every top-level field and metadata field
//! - Equality filters resolved through the indexes
//! - TTL-based record expiry
//! - Named, immutable point-in-time versions
//!
//! ## Example
//!
//! ```rust
//! use serde_json::{json, Map};
//! use tomedb_core::{Config, Database};
//!
//! # fn main() -> tomedb_core::StoreResult<()> {
//! let dir = tempfile::tempdir()?;
//! let db = Database::open(dir.path(), "")?;
//!
//! let mut fields = Map::new();
//! fields.insert("title".to_string(), json!("Dune"));
//! let id = db.insert(fields, Some(json!({"shelf": "sf"})))?;
//!
//! let mut by_title = Map::new();
//! by_title.insert("title".to_string(), json!("Dune"));
//! let matches = db.filter(&by_title);
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].id, id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod expiry;
mod index;
mod record;
mod version;
mod wal;

pub use config::Config;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use index::{EngineState, FieldIndex};
pub use record::{Record, RecordId, ValueKey, RESERVED_FIELDS};
pub use version::{
    VersionController, VersionMetadata, DEFAULT_SNAPSHOT_CHUNK_SIZE,
};
pub use wal::{chunk_files, ChunkLog, LogEntry};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
