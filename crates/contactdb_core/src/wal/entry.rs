//! WAL entry types.

use crate::record::{Record, RecordEdit};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// One logged mutation.
///
/// Serialized as `{"op": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "lowercase")]
pub enum WalEntry {
    /// A record was added.
    Add {
        /// Id assigned to the new record.
        id: RecordId,
        /// Name.
        name: String,
        /// Phone number.
        phone_number: String,
        /// Remark.
        #[serde(default)]
        remark: String,
    },
    /// A record was deleted.
    Delete {
        /// Id of the removed record.
        id: RecordId,
        /// Its name at deletion time.
        name: String,
    },
    /// A record was edited.
    Edit {
        /// Id of the edited record.
        id: RecordId,
        /// Its name before the edit.
        name: String,
        /// Replacement name, if any.
        new_name: Option<String>,
        /// Replacement phone, if any.
        new_phone: Option<String>,
        /// Replacement remark, if any.
        new_remark: Option<String>,
    },
}

impl WalEntry {
    /// Entry for adding `record`.
    #[must_use]
    pub fn add(record: &Record) -> Self {
        Self::Add {
            id: record.id,
            name: record.name.clone(),
            phone_number: record.phone.clone(),
            remark: record.remark.clone(),
        }
    }

    /// Entry for deleting `record`.
    #[must_use]
    pub fn delete(record: &Record) -> Self {
        Self::Delete {
            id: record.id,
            name: record.name.clone(),
        }
    }

    /// Entry for applying `edit` to `record`.
    #[must_use]
    pub fn edit(record: &Record, edit: &RecordEdit) -> Self {
        Self::Edit {
            id: record.id,
            name: record.name.clone(),
            new_name: edit.new_name.clone(),
            new_phone: edit.new_phone.clone(),
            new_remark: edit.new_remark.clone(),
        }
    }

    /// The record this entry affects.
    #[must_use]
    pub fn id(&self) -> RecordId {
        match self {
            Self::Add { id, .. } | Self::Delete { id, .. } | Self::Edit { id, .. } => *id,
        }
    }

    /// The `op` tag as written to the log.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
            Self::Edit { .. } => "edit",
        }
    }

    /// The edit carried by an `edit` entry.
    #[must_use]
    pub fn as_edit(&self) -> Option<RecordEdit> {
        match self {
            Self::Edit {
                new_name,
                new_phone,
                new_remark,
                ..
            } => Some(RecordEdit {
                new_name: new_name.clone(),
                new_phone: new_phone.clone(),
                new_remark: new_remark.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_entry_wire_shape() {
        let record = Record::new(RecordId::new(1), "Ann", "111", "work");
        let value = serde_json::to_value(WalEntry::add(&record)).unwrap();

        assert_eq!(
            value,
            json!({
                "op": "add",
                "data": {"id": 1, "name": "Ann", "phone_number": "111", "remark": "work"}
            })
        );
    }

    #[test]
    fn edit_entry_writes_absent_fields_as_null() {
        let record = Record::new(RecordId::new(2), "Bo", "222", "");
        let entry = WalEntry::edit(&record, &RecordEdit::new().name("Bob"));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["op"], "edit");
        assert_eq!(value["data"]["new_name"], "Bob");
        assert!(value["data"]["new_phone"].is_null());
        assert_eq!(entry.id(), RecordId::new(2));
    }

    #[test]
    fn parses_hand_written_lines() {
        let entry: WalEntry =
            serde_json::from_str(r#"{"op":"delete","data":{"id":5,"name":"Cy"}}"#).unwrap();
        assert_eq!(
            entry,
            WalEntry::Delete {
                id: RecordId::new(5),
                name: "Cy".into()
            }
        );

        let entry: WalEntry =
            serde_json::from_str(r#"{"op":"edit","data":{"id":5,"name":"Cy","new_remark":"x"}}"#)
                .unwrap();
        assert_eq!(entry.as_edit(), Some(RecordEdit::new().remark("x")));
    }

    #[test]
    fn unknown_op_is_an_error() {
        let parsed = serde_json::from_str::<WalEntry>(r#"{"op":"merge","data":{"id":1}}"#);
        assert!(parsed.is_err());
    }
}
