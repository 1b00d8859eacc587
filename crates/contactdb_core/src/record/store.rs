//! Ordered in-memory record collection with uniqueness rules.

use super::{is_blank, Record, RecordEdit};
use crate::error::{CoreError, CoreResult};
use crate::types::RecordId;
use std::collections::BTreeSet;

/// In-memory ordered collection of contact records.
///
/// Enforces, at write time:
/// - no two records share `(name, phone)`
/// - no two records share `phone`
/// - a repeated name needs a non-blank remark on the record being written
///
/// Records keep insertion order unless [`sort_by_name_initial`] reorders
/// them.
///
/// [`sort_by_name_initial`]: RecordStore::sort_by_name_initial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<Record>,
    next_id: RecordId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: RecordId::FIRST,
        }
    }
}

impl RecordStore {
    /// Creates an empty store whose first id will be 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from loaded records.
    ///
    /// The id counter becomes `max(persisted_next_id, max id + 1)`, so ids
    /// freed by deleting the newest record are not handed out again.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if a record carries `u64::MAX`,
    /// which leaves no id to assign next.
    pub fn from_records(
        records: Vec<Record>,
        persisted_next_id: Option<RecordId>,
    ) -> CoreResult<Self> {
        let after_max = match records.iter().map(|r| r.id).max() {
            Some(max) => successor(max)?,
            None => RecordId::FIRST,
        };
        let next_id = persisted_next_id.map_or(after_max, |n| n.max(after_max));
        Ok(Self { records, next_id })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in their current order.
    #[must_use]
    pub fn list(&self) -> &[Record] {
        &self.records
    }

    /// The id the next added record will receive.
    #[must_use]
    pub fn next_id(&self) -> RecordId {
        self.next_id
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Returns the list position of the record with `id`.
    #[must_use]
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Returns the first record, in list order, with exactly this name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns every record with exactly this name, in list order.
    pub fn all_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.name == name)
    }

    /// Returns the records whose ids are in `ids`, in list order.
    #[must_use]
    pub fn select(&self, ids: &BTreeSet<RecordId>) -> Vec<Record> {
        if ids.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect()
    }

    /// Checks whether `(name, phone, remark)` may be added.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateEntry`] if the exact pair exists
    /// - [`CoreError::AmbiguousName`] if the name exists and `remark` is blank
    /// - [`CoreError::PhoneConflict`] if another record uses `phone`
    /// - [`CoreError::IdsExhausted`] if the counter has reached `u64::MAX`
    pub fn check_add(&self, name: &str, phone: &str, remark: &str) -> CoreResult<()> {
        if self.next_id.checked_next().is_none() {
            return Err(CoreError::IdsExhausted { last: self.next_id });
        }

        if self
            .records
            .iter()
            .any(|r| r.name == name && r.phone == phone)
        {
            return Err(CoreError::duplicate_entry(name, phone));
        }

        if is_blank(remark) && self.find_by_name(name).is_some() {
            return Err(CoreError::ambiguous_name(name));
        }

        if let Some(owner) = self.records.iter().find(|r| r.phone == phone) {
            return Err(CoreError::phone_conflict(phone, owner.name.as_str()));
        }

        Ok(())
    }

    /// Appends an already validated record and advances the id counter past
    /// its id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] for id `u64::MAX`; nothing is
    /// inserted.
    pub fn insert(&mut self, record: Record) -> CoreResult<()> {
        if record.id >= self.next_id {
            self.next_id = successor(record.id)?;
        }
        self.records.push(record);
        Ok(())
    }

    /// Inserts `record` unless a record with the same id exists.
    ///
    /// Returns true if it was inserted.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn insert_if_absent(&mut self, record: Record) -> CoreResult<bool> {
        if self.get(record.id).is_some() {
            return Ok(false);
        }
        self.insert(record)?;
        Ok(true)
    }

    /// Validates and adds a record, returning its new id.
    ///
    /// # Errors
    ///
    /// See [`check_add`](Self::check_add).
    pub fn add(&mut self, name: &str, phone: &str, remark: &str) -> CoreResult<RecordId> {
        self.check_add(name, phone, remark)?;
        let id = self.next_id;
        self.insert(Record::new(id, name, phone, remark))?;
        Ok(id)
    }

    /// Removes the first record with exactly this name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no record has the name.
    pub fn delete(&mut self, name: &str) -> CoreResult<Record> {
        let id = self
            .find_by_name(name)
            .map(|r| r.id)
            .ok_or_else(|| CoreError::not_found(name))?;
        self.remove_by_id(id)
            .ok_or(CoreError::RecordNotFound { id })
    }

    /// Removes the record with `id`, if present.
    pub fn remove_by_id(&mut self, id: RecordId) -> Option<Record> {
        let pos = self.position(id)?;
        Some(self.records.remove(pos))
    }

    /// Checks whether `edit` may be applied to the first record named `name`
    /// and returns that record.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no record has the name
    /// - [`CoreError::AmbiguousName`] if renaming onto another record's name
    ///   without a non-blank new remark
    /// - [`CoreError::PhoneConflict`] if the new phone belongs to another record
    pub fn check_edit(&self, name: &str, edit: &RecordEdit) -> CoreResult<&Record> {
        let target = self
            .find_by_name(name)
            .ok_or_else(|| CoreError::not_found(name))?;
        self.check_edit_of(target, edit)?;
        Ok(target)
    }

    /// Checks whether `edit` may be applied to the record with `id`.
    ///
    /// # Errors
    ///
    /// As [`check_edit`](Self::check_edit), with
    /// [`CoreError::RecordNotFound`] for a missing id.
    pub fn check_edit_by_id(&self, id: RecordId, edit: &RecordEdit) -> CoreResult<&Record> {
        let target = self.get(id).ok_or(CoreError::RecordNotFound { id })?;
        self.check_edit_of(target, edit)?;
        Ok(target)
    }

    fn check_edit_of(&self, target: &Record, edit: &RecordEdit) -> CoreResult<()> {
        if let Some(new_name) = edit.new_name.as_deref() {
            let taken = new_name != target.name
                && self
                    .records
                    .iter()
                    .any(|r| r.id != target.id && r.name == new_name);
            if taken && edit.new_remark.as_deref().map_or(true, is_blank) {
                return Err(CoreError::ambiguous_name(new_name));
            }
        }

        if let Some(new_phone) = edit.new_phone.as_deref() {
            if new_phone != target.phone {
                if let Some(owner) = self
                    .records
                    .iter()
                    .find(|r| r.id != target.id && r.phone == new_phone)
                {
                    return Err(CoreError::phone_conflict(new_phone, owner.name.as_str()));
                }
            }
        }

        Ok(())
    }

    /// Validates and applies `edit` to the first record named `name`.
    ///
    /// # Errors
    ///
    /// See [`check_edit`](Self::check_edit).
    pub fn edit(&mut self, name: &str, edit: &RecordEdit) -> CoreResult<RecordId> {
        let id = self.check_edit(name, edit)?.id;
        self.apply_edit_by_id(id, edit);
        Ok(id)
    }

    /// Applies `edit` to the record with `id` without validation.
    ///
    /// Returns the record as it was before and after the edit, or `None` if
    /// the id is unknown.
    pub fn apply_edit_by_id(&mut self, id: RecordId, edit: &RecordEdit) -> Option<(Record, Record)> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        let before = record.clone();
        edit.apply_to(record);
        Some((before, record.clone()))
    }

    /// Sorts records by the uppercase first character of their name, then by
    /// full name. Records with an empty name go last.
    ///
    /// The sort is stable and touches neither ids nor indexes.
    pub fn sort_by_name_initial(&mut self) {
        self.records.sort_by_cached_key(|r| initial_sort_key(&r.name));
    }
}

fn successor(id: RecordId) -> CoreResult<RecordId> {
    id.checked_next().ok_or_else(|| {
        CoreError::invalid_format(format!("record id {id} leaves no id to assign"))
    })
}

fn initial_sort_key(name: &str) -> (bool, String, String) {
    let Some(first) = name.chars().next() else {
        return (true, String::new(), String::new());
    };
    (false, first.to_uppercase().collect(), name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(store: &RecordStore) -> Vec<&str> {
        store.list().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut store = RecordStore::new();
        assert_eq!(store.add("Ann", "111", "").unwrap(), RecordId::new(1));
        assert_eq!(store.add("Bob", "222", "").unwrap(), RecordId::new(2));
        assert_eq!(store.next_id(), RecordId::new(3));
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();

        let err = store.add("Ann", "111", "again").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEntry { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn repeated_name_needs_remark() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();

        assert!(matches!(
            store.add("Ann", "222", "   "),
            Err(CoreError::AmbiguousName { .. })
        ));
        assert_eq!(store.add("Ann", "222", "work").unwrap(), RecordId::new(2));
        assert_eq!(store.all_by_name("Ann").count(), 2);
    }

    #[test]
    fn shared_phone_is_rejected() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();

        let err = store.add("Bob", "111", "").unwrap_err();
        match err {
            CoreError::PhoneConflict { phone, owner } => {
                assert_eq!(phone, "111");
                assert_eq!(owner, "Ann");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn delete_removes_first_match_only() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Ann", "222", "work").unwrap();

        let removed = store.delete("Ann").unwrap();
        assert_eq!(removed.id, RecordId::new(1));
        assert_eq!(store.find_by_name("Ann").unwrap().id, RecordId::new(2));
    }

    #[test]
    fn delete_missing_name_fails() {
        let mut store = RecordStore::new();
        assert!(matches!(
            store.delete("Nobody"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Bob", "222", "").unwrap();
        store.delete("Bob").unwrap();

        assert_eq!(store.add("Cy", "333", "").unwrap(), RecordId::new(3));
    }

    #[test]
    fn from_records_respects_persisted_counter() {
        let records = vec![Record::new(RecordId::new(2), "Ann", "111", "")];
        assert_eq!(
            RecordStore::from_records(records.clone(), None).unwrap().next_id(),
            RecordId::new(3)
        );
        assert_eq!(
            RecordStore::from_records(records.clone(), Some(RecordId::new(9)))
                .unwrap()
                .next_id(),
            RecordId::new(9)
        );
        assert_eq!(
            RecordStore::from_records(records, Some(RecordId::new(1)))
                .unwrap()
                .next_id(),
            RecordId::new(3)
        );
        assert_eq!(
            RecordStore::from_records(Vec::new(), None).unwrap().next_id(),
            RecordId::FIRST
        );
    }

    #[test]
    fn edit_keeps_absent_fields() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "home").unwrap();

        store.edit("Ann", &RecordEdit::new().phone("999")).unwrap();
        let record = store.find_by_name("Ann").unwrap();
        assert_eq!(record.phone, "999");
        assert_eq!(record.remark, "home");
    }

    #[test]
    fn rename_onto_taken_name_needs_remark() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Bob", "222", "").unwrap();

        assert!(matches!(
            store.edit("Bob", &RecordEdit::new().name("Ann")),
            Err(CoreError::AmbiguousName { .. })
        ));
        store
            .edit("Bob", &RecordEdit::new().name("Ann").remark("neighbour"))
            .unwrap();
        assert_eq!(store.all_by_name("Ann").count(), 2);
    }

    #[test]
    fn rename_to_own_name_is_not_ambiguous() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Ann", "222", "work").unwrap();

        assert!(store.edit("Ann", &RecordEdit::new().name("Ann")).is_ok());
    }

    #[test]
    fn edit_onto_taken_phone_fails() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Bob", "222", "").unwrap();

        assert!(matches!(
            store.edit("Bob", &RecordEdit::new().phone("111")),
            Err(CoreError::PhoneConflict { .. })
        ));
        assert!(store.edit("Bob", &RecordEdit::new().phone("222")).is_ok());
    }

    #[test]
    fn edit_missing_name_fails() {
        let mut store = RecordStore::new();
        assert!(matches!(
            store.edit("Ghost", &RecordEdit::new().remark("x")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn sort_by_initial_is_case_insensitive_and_stable() {
        let mut store = RecordStore::new();
        store.add("bob", "1", "").unwrap();
        store.add("alice", "2", "").unwrap();
        store.add("Alice", "3", "").unwrap();
        store.add("", "4", "").unwrap();
        store.add("Carl", "5", "").unwrap();

        store.sort_by_name_initial();
        assert_eq!(names(&store), vec!["Alice", "alice", "bob", "Carl", ""]);

        let ids: Vec<u64> = store.list().iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 2, 1, 5, 4]);
    }

    #[test]
    fn insert_if_absent_skips_known_id() {
        let mut store = RecordStore::new();
        store.insert(Record::new(RecordId::new(5), "Ann", "111", "")).unwrap();

        assert!(!store
            .insert_if_absent(Record::new(RecordId::new(5), "X", "0", ""))
            .unwrap());
        assert!(store
            .insert_if_absent(Record::new(RecordId::new(7), "Bob", "2", ""))
            .unwrap());
        assert_eq!(store.next_id(), RecordId::new(8));
    }

    #[test]
    fn last_id_is_rejected_without_panicking() {
        let max = RecordId::new(u64::MAX);
        let records = vec![Record::new(max, "Ann", "111", "")];
        assert!(matches!(
            RecordStore::from_records(records, None),
            Err(CoreError::InvalidFormat { .. })
        ));

        let mut store = RecordStore::new();
        assert!(store.insert(Record::new(max, "Ann", "111", "")).is_err());
        assert!(store.is_empty());
        assert_eq!(store.next_id(), RecordId::FIRST);
    }

    #[test]
    fn add_stops_before_the_last_id() {
        let near_end = RecordId::new(u64::MAX - 1);
        let records = vec![Record::new(near_end, "Ann", "111", "")];
        let mut store = RecordStore::from_records(records, None).unwrap();
        assert_eq!(store.next_id(), RecordId::new(u64::MAX));

        let err = store.add("Bob", "222", "").unwrap_err();
        assert!(matches!(err, CoreError::IdsExhausted { .. }));
        assert!(err.is_validation());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn select_preserves_list_order() {
        let mut store = RecordStore::new();
        store.add("Ann", "111", "").unwrap();
        store.add("Bob", "222", "").unwrap();
        store.add("Cy", "333", "").unwrap();

        let ids: BTreeSet<_> = [RecordId::new(3), RecordId::new(1)].into_iter().collect();
        let picked: Vec<_> = store.select(&ids).into_iter().map(|r| r.name).collect();
        assert_eq!(picked, vec!["Ann", "Cy"]);
    }
}
