//! Contact records and the in-memory record store.

mod store;

pub use store::RecordStore;

use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// A single contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique, immutable id.
    pub id: RecordId,
    /// Display name; not unique on its own.
    pub name: String,
    /// Phone number; unique across the store.
    #[serde(rename = "phone_number")]
    pub phone: String,
    /// Free-form remark used to tell records with the same name apart.
    #[serde(default)]
    pub remark: String,
}

impl Record {
    /// Creates a record.
    pub fn new(
        id: RecordId,
        name: impl Into<String>,
        phone: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            remark: remark.into(),
        }
    }
}

/// A partial update of a record.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordEdit {
    /// Replacement name.
    pub new_name: Option<String>,
    /// Replacement phone number.
    pub new_phone: Option<String>,
    /// Replacement remark.
    pub new_remark: Option<String>,
}

impl RecordEdit {
    /// Creates an edit that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replacement name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.new_name = Some(name.into());
        self
    }

    /// Sets the replacement phone number.
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.new_phone = Some(phone.into());
        self
    }

    /// Sets the replacement remark.
    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.new_remark = Some(remark.into());
        self
    }

    /// Returns true if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none() && self.new_phone.is_none() && self.new_remark.is_none()
    }

    /// Applies the provided fields to `record`.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(name) = &self.new_name {
            record.name.clone_from(name);
        }
        if let Some(phone) = &self.new_phone {
            record.phone.clone_from(phone);
        }
        if let Some(remark) = &self.new_remark {
            record.remark.clone_from(remark);
        }
    }
}

/// Whether a remark is missing for disambiguation purposes.
pub(crate) fn is_blank(remark: &str) -> bool {
    remark.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_uses_phone_number_field() {
        let record = Record::new(RecordId::new(1), "Ann", "111", "");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phone_number"], "111");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn record_without_remark_deserializes() {
        let record: Record =
            serde_json::from_str(r#"{"id":3,"name":"Bo","phone_number":"9"}"#).unwrap();
        assert_eq!(record.remark, "");
    }

    #[test]
    fn edit_only_touches_given_fields() {
        let mut record = Record::new(RecordId::new(1), "Ann", "111", "home");
        RecordEdit::new().phone("222").apply_to(&mut record);

        assert_eq!(record.name, "Ann");
        assert_eq!(record.phone, "222");
        assert_eq!(record.remark, "home");
        assert!(RecordEdit::new().is_empty());
    }

    #[test]
    fn whitespace_remark_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("  \t"));
        assert!(!is_blank(" work "));
    }
}
