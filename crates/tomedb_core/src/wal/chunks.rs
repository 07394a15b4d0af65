//! Append-only chunk files.
//!
//! The log for one engine is a directory of chunk files named
//! `{base}_{N}.json`, N ascending chronologically from 0. Entries are
//! appended to the highest-numbered chunk as newline-delimited JSON, one
//! independently parseable entry per line; once a chunk reaches the
//! configured size threshold, the next append goes to a new chunk.
//!
//! Loading reads every chunk in ascending order. A chunk whose first
//! non-whitespace byte is `[` is parsed as one JSON array of entries, the
//! legacy whole-array encoding some older data directories still carry.
//! New writes are always newline-delimited.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StoreResult;
use crate::wal::entry::LogEntry;

/// Lists a directory's chunk files for a base name, ascending by index.
///
/// Only files named exactly `{base}_{N}.json` with a non-negative integer
/// `N` are returned. A missing directory yields an empty list.
pub fn chunk_files(dir: &Path, base: &str) -> StoreResult<Vec<(u64, PathBuf)>> {
    let mut chunks = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(chunks),
        Err(err) => return Err(err.into()),
    };

    let prefix = format!("{base}_");
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name.strip_prefix(&prefix).and_then(|s| s.strip_suffix(".json"))
        else {
            continue;
        };
        if let Ok(index) = stem.parse::<u64>() {
            chunks.push((index, entry.path()));
        }
    }

    chunks.sort_by_key(|(index, _)| *index);
    Ok(chunks)
}

/// The append-only log for one engine, rotated across size-bounded chunks.
///
/// `append` durably writes one entry before the caller is permitted to
/// apply it to in-memory state; `load` returns every durably appended entry
/// in creation order across chunk boundaries.
#[derive(Debug)]
pub struct ChunkLog {
    dir: PathBuf,
    base: String,
    size_limit: u64,
    sync_on_write: bool,
    current_index: u64,
    current_size: u64,
    current_file: File,
}

impl ChunkLog {
    /// Opens the log in an existing directory.
    ///
    /// The highest-numbered existing chunk becomes current unless it has
    /// already reached the size limit, in which case the next chunk is
    /// created and becomes current. An empty directory starts at chunk 0.
    pub fn open(
        dir: &Path,
        base: &str,
        size_limit: u64,
        sync_on_write: bool,
    ) -> StoreResult<Self> {
        let existing = chunk_files(dir, base)?;
        let (index, size) = match existing.last() {
            Some((last_index, path)) => {
                let size = fs::metadata(path)?.len();
                if size >= size_limit {
                    (last_index + 1, 0)
                } else {
                    (*last_index, size)
                }
            }
            None => (0, 0),
        };

        let path = Self::chunk_path(dir, base, index);
        let current_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            base: base.to_string(),
            size_limit,
            sync_on_write,
            current_index: index,
            current_size: size,
            current_file,
        })
    }

    fn chunk_path(dir: &Path, base: &str, index: u64) -> PathBuf {
        dir.join(format!("{base}_{index}.json"))
    }

    /// Path of the chunk appends currently go to.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        Self::chunk_path(&self.dir, &self.base, self.current_index)
    }

    /// Durably appends one entry.
    ///
    /// The entry is written as a single line and flushed (and fsynced when
    /// the log was opened with `sync_on_write`) before this returns. On
    /// error the caller must not apply the entry to in-memory state.
    pub fn append(&mut self, entry: &LogEntry) -> StoreResult<()> {
        if self.current_size >= self.size_limit {
            self.rotate()?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        self.current_file.write_all(line.as_bytes())?;
        self.current_file.flush()?;
        if self.sync_on_write {
            self.current_file.sync_data()?;
        }

        self.current_size += line.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> StoreResult<()> {
        let next = self.current_index + 1;
        let path = Self::chunk_path(&self.dir, &self.base, next);
        self.current_file = OpenOptions::new().append(true).create(true).open(&path)?;
        self.current_index = next;
        self.current_size = 0;
        Ok(())
    }

    /// Loads every entry ever appended, in creation order.
    ///
    /// Malformed lines and unreadable or corrupt chunks are skipped with a
    /// warning rather than failing the whole load; a torn trailing line
    /// from a crashed append is the expected case of this.
    pub fn load(&self) -> StoreResult<Vec<LogEntry>> {
        let mut entries = Vec::new();
        for (index, path) in chunk_files(&self.dir, &self.base)? {
            read_chunk(&path, &mut entries);
            tracing::debug!(chunk = index, total = entries.len(), "loaded chunk");
        }
        Ok(entries)
    }

    /// Writes a standalone chunk file holding the given entries.
    ///
    /// Used by the version controller for snapshot export; the file is
    /// written whole (newline-delimited) and fsynced.
    pub fn write_chunk(path: &Path, entries: &[LogEntry]) -> StoreResult<()> {
        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }

        let mut file = File::create(path)?;
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Reads one chunk file into `entries`, skipping what doesn't parse.
fn read_chunk(path: &Path, entries: &mut Vec<LogEntry>) {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(chunk = %path.display(), %err, "skipping unreadable chunk");
            return;
        }
    };

    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return;
    }

    // Legacy encoding: the whole chunk is one JSON array.
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<LogEntry>>(trimmed) {
            Ok(parsed) => entries.extend(parsed),
            Err(err) => {
                warn!(chunk = %path.display(), %err, "skipping corrupt array chunk");
            }
        }
        return;
    }

    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                // Data-loss risk worth surfacing, but never fatal to the
                // load; a torn trailing line lands here after a crash.
                warn!(
                    chunk = %path.display(),
                    line = number + 1,
                    %err,
                    "skipping malformed log line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordId};
    use serde_json::json;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn insert(id: u64, name: &str) -> LogEntry {
        let fields = [("name".to_string(), json!(name))].into_iter().collect();
        LogEntry::Insert {
            data: Record::new(RecordId::new(id), fields, None).unwrap(),
        }
    }

    #[test]
    fn append_then_load() {
        let temp = tempdir().unwrap();
        let mut log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();

        log.append(&insert(0, "a")).unwrap();
        log.append(&insert(1, "b")).unwrap();
        log.append(&LogEntry::Delete { id: RecordId::new(0) }).unwrap();

        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], LogEntry::Delete { id: RecordId::new(0) });
    }

    #[test]
    fn rotation_by_size() {
        let temp = tempdir().unwrap();
        // Tiny limit: every append lands in a fresh chunk after the first.
        let mut log = ChunkLog::open(temp.path(), "data", 10, false).unwrap();

        for i in 0..4 {
            log.append(&insert(i, "x")).unwrap();
        }

        let chunks = chunk_files(temp.path(), "data").unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].0, 0);
        assert_eq!(chunks[3].0, 3);

        // Order survives the chunk boundaries.
        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 4);
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                LogEntry::Insert { data } => assert_eq!(data.id.as_u64(), i as u64),
                other => panic!("unexpected entry {other:?}"),
            }
        }
    }

    #[test]
    fn reopen_resumes_highest_chunk() {
        let temp = tempdir().unwrap();
        {
            let mut log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
            log.append(&insert(0, "a")).unwrap();
        }

        let mut log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
        assert!(log.current_path().ends_with("data_0.json"));
        log.append(&insert(1, "b")).unwrap();

        assert_eq!(log.load().unwrap().len(), 2);
        assert_eq!(chunk_files(temp.path(), "data").unwrap().len(), 1);
    }

    #[test]
    fn reopen_rotates_full_chunk() {
        let temp = tempdir().unwrap();
        {
            let mut log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
            log.append(&insert(0, "a")).unwrap();
        }

        // A limit below the existing chunk's size forces a new chunk.
        let log = ChunkLog::open(temp.path(), "data", 1, false).unwrap();
        assert!(log.current_path().ends_with("data_1.json"));
    }

    #[test]
    fn torn_trailing_line_is_skipped() {
        let temp = tempdir().unwrap();
        let mut log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
        log.append(&insert(0, "a")).unwrap();
        log.append(&insert(1, "b")).unwrap();

        // Simulate a crash mid-append: a partial last line.
        let mut file = OpenOptions::new()
            .append(true)
            .open(log.current_path())
            .unwrap();
        file.write_all(b"{\"type\":\"insert\",\"data\":{\"id\":2,").unwrap();
        drop(file);

        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn legacy_array_chunk_is_imported() {
        let temp = tempdir().unwrap();
        let legacy = temp.path().join("data_0.json");
        fs::write(
            &legacy,
            r#"[
  {"type":"insert","data":{"id":0,"name":"a"}},
  {"type":"update","id":0,"changes":{"name":"b"}}
]"#,
        )
        .unwrap();

        let log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind(), "insert");
        assert_eq!(entries[1].kind(), "update");
    }

    #[test]
    fn corrupt_chunk_does_not_abort_load() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("data_0.json"), "[ this is not json").unwrap();
        fs::write(
            temp.path().join("data_1.json"),
            "{\"type\":\"insert\",\"data\":{\"id\":0,\"name\":\"a\"}}\n",
        )
        .unwrap();

        let log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("metadata.json"), "{}").unwrap();
        fs::write(temp.path().join("data_x.json"), "junk").unwrap();
        fs::write(temp.path().join("other_0.json"), "junk").unwrap();

        assert!(chunk_files(temp.path(), "data").unwrap().is_empty());
    }

    #[test]
    fn write_chunk_round_trips() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("data_0.json");
        let entries = vec![insert(0, "a"), insert(1, "b")];
        ChunkLog::write_chunk(&path, &entries).unwrap();

        let log = ChunkLog::open(temp.path(), "data", 100_000, false).unwrap();
        assert_eq!(log.load().unwrap(), entries);
    }
}
