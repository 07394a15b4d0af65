//! In-memory engine state: primary map, storage order, secondary indexes.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::collections::HashMap;
use tracing::warn;

use crate::index::field::FieldIndex;
use crate::record::{Record, RecordId};
use crate::wal::LogEntry;

/// The replayable in-memory state of one engine.
///
/// `EngineState` owns the only live copy of each record (the primary map);
/// the storage-order sequence and both secondary indexes hold ids only.
/// Every mutation goes through [`apply`](Self::apply), which is the same
/// routine for live writes and for load-time replay, so state is always
/// exactly what replaying the log from empty produces.
#[derive(Debug, Default)]
pub struct EngineState {
    /// Insertion order of live record ids; filter results follow it.
    order: Vec<RecordId>,
    /// Primary index: id to the record itself.
    primary: HashMap<RecordId, Record>,
    /// Inverted index over top-level fields (excluding `metadata`).
    fields_index: FieldIndex,
    /// Inverted index over the fields inside `metadata`.
    metadata_index: FieldIndex,
    /// Next id to assign; advanced past every replayed id.
    next_id: u64,
}

impl EngineState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next record id.
    pub fn allocate_id(&mut self) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// The next id that will be assigned.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// The highest id assigned so far, if any.
    #[must_use]
    pub fn last_id(&self) -> Option<RecordId> {
        self.next_id.checked_sub(1).map(RecordId::new)
    }

    /// Advances the id counter so it will never hand out `last_id` again.
    pub fn advance_past(&mut self, last_id: RecordId) {
        self.next_id = self.next_id.max(last_id.as_u64() + 1);
    }

    /// Applies one log entry.
    ///
    /// This mutates storage and both secondary indexes so that the index
    /// invariant holds afterwards: an id appears under `field = value`
    /// exactly when the live record currently holds that value.
    pub fn apply(&mut self, entry: &LogEntry) {
        match entry {
            LogEntry::Insert { data } => self.apply_insert(data),
            LogEntry::Update { id, changes } => self.apply_update(*id, changes),
            LogEntry::Delete { id } => self.apply_delete(*id),
        }
    }

    fn apply_insert(&mut self, data: &Record) {
        if self.primary.contains_key(&data.id) {
            // Only reachable replaying a corrupt or hand-edited log;
            // clobbering the live record would break the one-copy invariant.
            warn!(id = %data.id, "skipping insert for already-live id");
            return;
        }

        self.advance_past(data.id);
        self.fields_index.index_object(&data.fields, data.id);
        if let Some(meta) = data.metadata_fields() {
            self.metadata_index.index_object(meta, data.id);
        }
        self.order.push(data.id);
        self.primary.insert(data.id, data.clone());
    }

    fn apply_update(&mut self, id: RecordId, changes: &Map<String, Value>) {
        let Some(record) = self.primary.get_mut(&id) else {
            return;
        };

        self.fields_index.unindex_object(&record.fields, id);
        if let Some(meta) = record.metadata_fields() {
            self.metadata_index.unindex_object(meta, id);
        }

        // Shallow overwrite: each named field replaces its prior value
        // wholesale. `metadata` swaps the whole metadata value; `id` is
        // immutable and ignored.
        for (field, value) in changes {
            match field.as_str() {
                "id" => warn!(%id, "ignoring id field in update changes"),
                "metadata" => record.metadata = Some(value.clone()),
                _ => {
                    record.fields.insert(field.clone(), value.clone());
                }
            }
        }

        self.fields_index.index_object(&record.fields, id);
        if let Some(meta) = record.metadata_fields() {
            self.metadata_index.index_object(meta, id);
        }
    }

    fn apply_delete(&mut self, id: RecordId) {
        let Some(record) = self.primary.remove(&id) else {
            return;
        };

        self.fields_index.unindex_object(&record.fields, id);
        if let Some(meta) = record.metadata_fields() {
            self.metadata_index.unindex_object(meta, id);
        }
        self.order.retain(|&live| live != id);
    }

    /// Looks up a live record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.primary.get(&id)
    }

    /// Evaluates an equality filter.
    ///
    /// Each constraint maps a field name to a required value; the reserved
    /// name `metadata` selects the metadata index, everything else the
    /// top-level index. A constraint on an unindexed field or value makes
    /// the result empty; otherwise the per-constraint id sets are
    /// intersected. An empty constraint set matches every live record.
    /// Results are in storage (insertion) order.
    #[must_use]
    pub fn filter(&self, constraints: &Map<String, Value>) -> Vec<Record> {
        if constraints.is_empty() {
            return self.all();
        }

        let mut candidates: Option<HashSet<RecordId>> = None;
        for (field, value) in constraints {
            let index = if field == "metadata" {
                &self.metadata_index
            } else {
                &self.fields_index
            };
            let Some(ids) = index.lookup(field, value) else {
                return Vec::new();
            };

            candidates = Some(match candidates {
                None => ids.clone(),
                Some(current) => current.intersection(ids).copied().collect(),
            });
        }

        let ids = candidates.unwrap_or_default();
        self.order
            .iter()
            .filter(|id| ids.contains(id))
            .filter_map(|id| self.primary.get(id).cloned())
            .collect()
    }

    /// Snapshot copy of every live record, in storage order.
    #[must_use]
    pub fn all(&self) -> Vec<Record> {
        self.order
            .iter()
            .filter_map(|id| self.primary.get(id).cloned())
            .collect()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no record is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of distinct indexed top-level field names.
    #[must_use]
    pub fn indexed_field_count(&self) -> usize {
        self.fields_index.field_count()
    }
}
