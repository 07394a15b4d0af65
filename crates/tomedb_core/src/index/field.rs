//! Inverted field index.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::record::{RecordId, ValueKey};

/// Inverted index from field name and value to the set of record ids
/// holding that value.
///
/// Value equality is structural, via [`ValueKey`]. Buckets are pruned as
/// soon as they empty, and a field's map is dropped with its last bucket,
/// so the index never holds tombstoned shapes.
#[derive(Debug, Default)]
pub struct FieldIndex {
    fields: HashMap<String, HashMap<ValueKey, HashSet<RecordId>>>,
}

impl FieldIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` under `field = value`.
    pub fn insert(&mut self, field: &str, value: &Value, id: RecordId) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .entry(ValueKey::of(value))
            .or_default()
            .insert(id);
    }

    /// Removes `id` from under `field = value`, pruning empty buckets.
    pub fn remove(&mut self, field: &str, value: &Value, id: RecordId) {
        let Some(buckets) = self.fields.get_mut(field) else {
            return;
        };
        let key = ValueKey::of(value);
        if let Some(ids) = buckets.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                buckets.remove(&key);
            }
        }
        if buckets.is_empty() {
            self.fields.remove(field);
        }
    }

    /// Returns the id set stored under `field = value`, if any.
    #[must_use]
    pub fn lookup(&self, field: &str, value: &Value) -> Option<&HashSet<RecordId>> {
        self.fields.get(field)?.get(&ValueKey::of(value))
    }

    /// Indexes every field of an object map under `id`.
    pub fn index_object(&mut self, object: &Map<String, Value>, id: RecordId) {
        for (field, value) in object {
            self.insert(field, value, id);
        }
    }

    /// Removes every field of an object map from under `id`.
    pub fn unindex_object(&mut self, object: &Map<String, Value>, id: RecordId) {
        for (field, value) in object {
            self.remove(field, value, id);
        }
    }

    /// Number of distinct indexed field names.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether the index holds nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
