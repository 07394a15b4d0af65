//! Record model: ids, documents, and index value keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Field names that cannot appear in a record's open field map.
///
/// `id` is engine-assigned and `metadata` is stored and indexed separately.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "metadata"];

/// Unique identifier for a record.
///
/// Ids are assigned by the engine from a monotonic counter and are never
/// reused, even after the record is deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Creates a record id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

/// A stored document.
///
/// A record is an open mapping of field name to JSON value plus the
/// engine-assigned `id` and an optional `metadata` value. On disk it is
/// serialized flat: `{"id":0, <fields...>, "metadata":{...}}`, with
/// `metadata` omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Engine-assigned id, immutable once assigned.
    pub id: RecordId,
    /// Top-level document fields. Never contains `id` or `metadata`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Optional metadata value, indexed separately from `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Record {
    /// Builds a record after checking for reserved field names.
    pub fn new(
        id: RecordId,
        fields: Map<String, Value>,
        metadata: Option<Value>,
    ) -> StoreResult<Self> {
        for name in RESERVED_FIELDS {
            if fields.contains_key(name) {
                return Err(StoreError::reserved_field(name));
            }
        }
        Ok(Self {
            id,
            fields,
            metadata,
        })
    }

    /// Returns the metadata fields as an object map.
    ///
    /// Absent metadata and non-object metadata both index as empty; a
    /// non-object metadata value has no named fields to invert.
    #[must_use]
    pub fn metadata_fields(&self) -> Option<&Map<String, Value>> {
        match &self.metadata {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Canonical index key for a JSON value.
///
/// Two values map to the same key exactly when they are structurally equal:
/// the key is the value's canonical JSON text, and `serde_json` object maps
/// are sorted, so member order cannot split an index bucket. Numbers compare
/// as they serialize (`1` and `1.0` are distinct keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKey(String);

impl ValueKey {
    /// Builds the canonical key for a value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        Self(value.to_string())
    }

    /// Returns the canonical JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn record_serializes_flat() {
        let record = Record::new(
            RecordId::new(3),
            obj(&[("name", json!("a")), ("count", json!(2))]),
            Some(json!({"tag": "x"})),
        )
        .unwrap();

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(
            encoded,
            json!({"id": 3, "name": "a", "count": 2, "metadata": {"tag": "x"}})
        );
    }

    #[test]
    fn record_omits_absent_metadata() {
        let record = Record::new(RecordId::new(0), obj(&[("name", json!("a"))]), None).unwrap();
        let text = serde_json::to_string(&record).unwrap();
        assert!(!text.contains("metadata"));
    }

    #[test]
    fn record_round_trips() {
        let record = Record::new(
            RecordId::new(7),
            obj(&[("nested", json!({"a": [1, 2, null]}))]),
            Some(json!(42)),
        )
        .unwrap();

        let text = serde_json::to_string(&record).unwrap();
        let decoded: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn reserved_field_names_rejected() {
        let result = Record::new(RecordId::new(0), obj(&[("id", json!(9))]), None);
        assert!(matches!(result, Err(StoreError::ReservedField { .. })));

        let result = Record::new(RecordId::new(0), obj(&[("metadata", json!(9))]), None);
        assert!(matches!(result, Err(StoreError::ReservedField { .. })));
    }

    #[test]
    fn value_key_is_structural() {
        let a = json!({"x": 1, "y": [true, "s"]});
        let b: Value = serde_json::from_str(r#"{"y":[true,"s"],"x":1}"#).unwrap();
        assert_eq!(ValueKey::of(&a), ValueKey::of(&b));
    }

    #[test]
    fn value_key_distinguishes_types() {
        assert_ne!(ValueKey::of(&json!(1)), ValueKey::of(&json!("1")));
        assert_ne!(ValueKey::of(&json!(null)), ValueKey::of(&json!(false)));
    }

    #[test]
    fn non_object_metadata_has_no_fields() {
        let record =
            Record::new(RecordId::new(1), Map::new(), Some(json!([1, 2, 3]))).unwrap();
        assert!(record.metadata_fields().is_none());
    }

    #[test]
    fn record_id_display() {
        assert_eq!(RecordId::new(42).to_string(), "rec:42");
    }
}
