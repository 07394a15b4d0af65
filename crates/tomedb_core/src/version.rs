//! Named point-in-time versions of an engine's record set.
//!
//! A version is an immutable directory under the controller's base
//! directory: chunk files of `Insert` entries for every record alive at
//! snapshot time, plus a `metadata.json` describing the snapshot. Versions
//! are created whole, never edited in place, and deleted whole.
//!
//! Concurrent `create_version` / `delete_version` calls against the same
//! name are not safe; callers must serialize per name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::database::Database;
use crate::error::{StoreError, StoreResult};
use crate::record::RecordId;
use crate::wal::{chunk_files, ChunkLog, LogEntry};

/// Default number of entries per snapshot chunk file.
pub const DEFAULT_SNAPSHOT_CHUNK_SIZE: usize = 500;

/// Base name of snapshot chunk files (`data_{N}.json`).
const SNAPSHOT_BASE: &str = "data";

/// Metadata file name inside a version directory.
const METADATA_FILE: &str = "metadata.json";
const METADATA_TEMP: &str = "metadata.json.tmp";

/// Descriptive metadata written alongside a version's chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Name of the data directory the snapshot was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<String>,
    /// Snapshot creation time.
    pub timestamp: DateTime<Utc>,
    /// Number of records in the snapshot.
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
    /// Number of chunk files.
    pub chunks: usize,
    /// The source engine's last-assigned id, so a restored engine resumes
    /// id allocation without reuse.
    #[serde(rename = "lastId", default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u64>,
}

/// Creates, lists, restores, and deletes named versions.
///
/// The controller owns a base directory with one subdirectory per version
/// name.
#[derive(Debug, Clone)]
pub struct VersionController {
    base_dir: PathBuf,
}

impl VersionController {
    /// Creates a controller over a base directory.
    ///
    /// The directory is created lazily on the first version write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory holding all versions.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves and validates a version directory.
    fn version_dir(&self, name: &str) -> StoreResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(StoreError::invalid_version_name(name));
        }
        Ok(self.base_dir.join(name))
    }

    /// Creates a new version with no records.
    pub fn create_empty_version(&self, name: &str) -> StoreResult<()> {
        let dir = self.version_dir(name)?;
        fs::create_dir_all(&dir)?;

        ChunkLog::write_chunk(&dir.join(format!("{SNAPSHOT_BASE}_0.json")), &[])?;
        self.write_metadata(
            &dir,
            &VersionMetadata {
                created_from: None,
                timestamp: Utc::now(),
                total_records: 0,
                chunks: 1,
                last_id: None,
            },
        )
    }

    /// Snapshots an engine's record set with the default chunk size.
    pub fn create_version(&self, db: &Database, name: &str) -> StoreResult<()> {
        self.create_version_with_chunk_size(db, name, DEFAULT_SNAPSHOT_CHUNK_SIZE)
    }

    /// Snapshots an engine's record set.
    ///
    /// Every live record becomes an `Insert` entry; entries are written in
    /// batches of at most `chunk_size` per chunk file, followed by the
    /// metadata file. An empty engine still writes one (empty) chunk.
    pub fn create_version_with_chunk_size(
        &self,
        db: &Database,
        name: &str,
        chunk_size: usize,
    ) -> StoreResult<()> {
        let dir = self.version_dir(name)?;
        let chunk_size = chunk_size.max(1);

        // Replace any previous snapshot under this name whole, so stale
        // higher-numbered chunks cannot survive into the new version.
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        let entries: Vec<LogEntry> = db
            .all()
            .into_iter()
            .map(|data| LogEntry::Insert { data })
            .collect();

        let mut chunks = 0;
        if entries.is_empty() {
            ChunkLog::write_chunk(&dir.join(format!("{SNAPSHOT_BASE}_0.json")), &[])?;
            chunks = 1;
        } else {
            for (index, batch) in entries.chunks(chunk_size).enumerate() {
                let path = dir.join(format!("{SNAPSHOT_BASE}_{index}.json"));
                ChunkLog::write_chunk(&path, batch)?;
                chunks += 1;
            }
        }

        let metadata = VersionMetadata {
            created_from: db
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            timestamp: Utc::now(),
            total_records: entries.len(),
            chunks,
            last_id: db.last_id().map(RecordId::as_u64),
        };
        self.write_metadata(&dir, &metadata)?;

        info!(
            version = name,
            records = metadata.total_records,
            chunks,
            "created version"
        );
        Ok(())
    }

    /// Restores a version into a fresh engine rooted at `target`.
    ///
    /// Fails with [`StoreError::VersionNotFound`] when the name does not
    /// exist. The snapshot's chunks are copied into `target` (rebased to
    /// the config's base name) and a new engine is opened there, replaying
    /// them through the normal apply path; the snapshot directory itself is
    /// never written to. When the metadata recorded a last-assigned id,
    /// the fresh engine's counter is advanced past it.
    pub fn load_version(
        &self,
        name: &str,
        target: &Path,
        key: &str,
        config: Config,
    ) -> StoreResult<Database> {
        let dir = self.version_dir(name)?;
        if !dir.is_dir() {
            return Err(StoreError::version_not_found(name));
        }

        fs::create_dir_all(target)?;
        for (index, path) in chunk_files(&dir, SNAPSHOT_BASE)? {
            let dest = target.join(format!("{}_{index}.json", config.base_name));
            fs::copy(&path, &dest)?;
        }

        let db = Database::open_with_config(target, key, config)?;
        if let Ok(metadata) = self.metadata(name) {
            if let Some(last_id) = metadata.last_id {
                db.advance_id_counter(RecordId::new(last_id));
            }
        }

        info!(version = name, records = db.len(), "loaded version");
        Ok(db)
    }

    /// Deletes a version whole.
    ///
    /// Returns false when the name did not exist.
    pub fn delete_version(&self, name: &str) -> StoreResult<bool> {
        let dir = self.version_dir(name)?;
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    /// Lists every version name, sorted.
    ///
    /// A missing base directory yields an empty list.
    pub fn list_versions(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reads a version's metadata.
    ///
    /// Fails with [`StoreError::VersionNotFound`] when no metadata file
    /// exists for the name.
    pub fn metadata(&self, name: &str) -> StoreResult<VersionMetadata> {
        let path = self.version_dir(name)?.join(METADATA_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::version_not_found(name));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes metadata.json atomically (write temp, fsync, rename).
    fn write_metadata(&self, dir: &Path, metadata: &VersionMetadata) -> StoreResult<()> {
        let temp = dir.join(METADATA_TEMP);
        let data = serde_json::to_vec_pretty(metadata)?;

        let mut file = File::create(&temp)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, dir.join(METADATA_FILE))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use tempfile::tempdir;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn open_db(path: &Path) -> Database {
        Database::open_with_config(path, "", Config::default().sync_on_write(false)).unwrap()
    }

    fn populated_db(path: &Path, count: usize) -> Database {
        let db = open_db(path);
        for i in 0..count {
            db.insert(
                fields(&[("name", json!(format!("r{i}"))), ("i", json!(i))]),
                Some(json!({"bucket": i % 3})),
            )
            .unwrap();
        }
        db
    }

    fn snapshot_fidelity(chunk_size: usize) {
        let temp = tempdir().unwrap();
        let db = populated_db(&temp.path().join("live"), 37);
        db.delete(RecordId::new(5)).unwrap();

        let versions = VersionController::new(temp.path().join("versions"));
        versions
            .create_version_with_chunk_size(&db, "v1", chunk_size)
            .unwrap();

        let restored = versions
            .load_version(
                "v1",
                &temp.path().join("restored"),
                "",
                Config::default().sync_on_write(false),
            )
            .unwrap();

        let mut expected = db.all();
        let mut actual = restored.all();
        expected.sort_by_key(|r| r.id);
        actual.sort_by_key(|r| r.id);
        assert_eq!(actual, expected);

        // The restored engine resumes past the source's last id.
        assert_eq!(restored.next_id(), db.next_id());
    }

    #[test]
    fn snapshot_fidelity_tiny_chunks() {
        snapshot_fidelity(1);
    }

    #[test]
    fn snapshot_fidelity_one_big_chunk() {
        snapshot_fidelity(10_000);
    }

    #[test]
    fn metadata_describes_snapshot() {
        let temp = tempdir().unwrap();
        let db = populated_db(&temp.path().join("live"), 7);

        let versions = VersionController::new(temp.path().join("versions"));
        versions
            .create_version_with_chunk_size(&db, "v1", 3)
            .unwrap();

        let metadata = versions.metadata("v1").unwrap();
        assert_eq!(metadata.total_records, 7);
        assert_eq!(metadata.chunks, 3); // ceil(7 / 3)
        assert_eq!(metadata.last_id, Some(6));
        assert_eq!(metadata.created_from.as_deref(), Some("live"));
    }

    #[test]
    fn metadata_wire_format() {
        let metadata = VersionMetadata {
            created_from: Some("live".to_string()),
            timestamp: Utc::now(),
            total_records: 3,
            chunks: 1,
            last_id: Some(9),
        };
        let encoded = serde_json::to_value(&metadata).unwrap();
        assert!(encoded.get("totalRecords").is_some());
        assert!(encoded.get("lastId").is_some());
        assert!(encoded.get("created_from").is_some());
        // ISO-8601 text, not a numeric timestamp.
        assert!(encoded.get("timestamp").unwrap().is_string());
    }

    #[test]
    fn empty_version_round_trip() {
        let temp = tempdir().unwrap();
        let versions = VersionController::new(temp.path().join("versions"));
        versions.create_empty_version("blank").unwrap();

        let metadata = versions.metadata("blank").unwrap();
        assert_eq!(metadata.total_records, 0);
        assert_eq!(metadata.chunks, 1);

        let db = versions
            .load_version(
                "blank",
                &temp.path().join("restored"),
                "",
                Config::default().sync_on_write(false),
            )
            .unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn load_missing_version_fails() {
        let temp = tempdir().unwrap();
        let versions = VersionController::new(temp.path().join("versions"));

        let result = versions.load_version(
            "nope",
            &temp.path().join("restored"),
            "",
            Config::default(),
        );
        assert!(matches!(result, Err(StoreError::VersionNotFound { .. })));
        assert!(matches!(
            versions.metadata("nope"),
            Err(StoreError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn list_and_delete_versions() {
        let temp = tempdir().unwrap();
        let versions = VersionController::new(temp.path().join("versions"));

        assert!(versions.list_versions().unwrap().is_empty());

        versions.create_empty_version("beta").unwrap();
        versions.create_empty_version("alpha").unwrap();
        assert_eq!(versions.list_versions().unwrap(), vec!["alpha", "beta"]);

        assert!(versions.delete_version("alpha").unwrap());
        assert!(!versions.delete_version("alpha").unwrap());
        assert_eq!(versions.list_versions().unwrap(), vec!["beta"]);
    }

    #[test]
    fn invalid_names_rejected() {
        let temp = tempdir().unwrap();
        let versions = VersionController::new(temp.path().join("versions"));

        for name in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(
                versions.create_empty_version(name),
                Err(StoreError::InvalidVersionName { .. })
            ));
        }
    }

    #[test]
    fn recreating_a_version_replaces_it() {
        let temp = tempdir().unwrap();
        let db = populated_db(&temp.path().join("live"), 10);
        let versions = VersionController::new(temp.path().join("versions"));

        // First snapshot with many small chunks, second with one chunk:
        // no stale chunk files may survive.
        versions
            .create_version_with_chunk_size(&db, "v1", 1)
            .unwrap();
        versions
            .create_version_with_chunk_size(&db, "v1", 100)
            .unwrap();

        let dir = temp.path().join("versions").join("v1");
        assert_eq!(chunk_files(&dir, "data").unwrap().len(), 1);

        let restored = versions
            .load_version(
                "v1",
                &temp.path().join("restored"),
                "",
                Config::default().sync_on_write(false),
            )
            .unwrap();
        assert_eq!(restored.len(), 10);
    }

    #[test]
    fn snapshot_directory_not_mutated_by_restored_engine() {
        let temp = tempdir().unwrap();
        let db = populated_db(&temp.path().join("live"), 3);
        let versions = VersionController::new(temp.path().join("versions"));
        versions.create_version(&db, "v1").unwrap();

        let dir = temp.path().join("versions").join("v1");
        let before = chunk_files(&dir, "data").unwrap();

        let restored = versions
            .load_version(
                "v1",
                &temp.path().join("restored"),
                "",
                Config::default().sync_on_write(false),
            )
            .unwrap();
        restored
            .insert(fields(&[("name", json!("new"))]), None)
            .unwrap();

        // New writes land in the restored engine's own log.
        assert_eq!(chunk_files(&dir, "data").unwrap(), before);
        assert_eq!(restored.len(), 4);
    }
}
