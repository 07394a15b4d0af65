//! Log entry types and their wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{Record, RecordId};

/// One durable, ordered mutation in the append-only log.
///
/// Entries are the sole source of truth: in-memory state is always
/// derivable by replaying the ordered entry sequence from empty. The wire
/// format is the tagged shape `{"type":"insert","data":{...}}` /
/// `{"type":"update","id":n,"changes":{...}}` / `{"type":"delete","id":n}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    /// A new record. `data.id` must not already be live when applied.
    Insert {
        /// The full record, id included.
        data: Record,
    },
    /// A shallow field merge into an existing record. No-op if the id is
    /// not live. A `metadata` key in `changes` replaces the whole metadata
    /// value; an `id` key is ignored.
    Update {
        /// Target record id.
        id: RecordId,
        /// Partial field map; each named field overwrites its prior value.
        changes: Map<String, Value>,
    },
    /// Removal of a record. No-op if the id is not live.
    Delete {
        /// Target record id.
        id: RecordId,
    },
}

impl LogEntry {
    /// Short tag for logging and the CLI dump output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_wire_format() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"type":"insert","data":{"id":0,"name":"a"}}"#).unwrap();
        match &entry {
            LogEntry::Insert { data } => {
                assert_eq!(data.id, RecordId::new(0));
                assert_eq!(data.fields.get("name"), Some(&json!("a")));
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let text = serde_json::to_string(&entry).unwrap();
        let reparsed: LogEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, entry);
    }

    #[test]
    fn update_wire_format() {
        let entry = LogEntry::Update {
            id: RecordId::new(4),
            changes: [("name".to_string(), json!("b"))].into_iter().collect(),
        };
        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            encoded,
            json!({"type":"update","id":4,"changes":{"name":"b"}})
        );
    }

    #[test]
    fn delete_wire_format() {
        let entry = LogEntry::Delete {
            id: RecordId::new(9),
        };
        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(encoded, json!({"type":"delete","id":9}));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let result = serde_json::from_str::<LogEntry>(r#"{"type":"truncate","id":1}"#);
        assert!(result.is_err());
    }
}
