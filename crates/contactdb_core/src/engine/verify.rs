//! Index consistency checks.

use super::state::EngineState;
use crate::index::build_indexes;
use crate::types::RecordId;
use std::collections::BTreeSet;

/// Result of comparing the live tries with a rebuild from the records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Records checked.
    pub records: usize,
    /// True if the name trie matches a rebuild exactly.
    pub prefix_consistent: bool,
    /// True if the phone trie matches a rebuild exactly.
    pub suffix_consistent: bool,
    /// Records whose name or phone cannot be found by exact key.
    pub unindexed: Vec<RecordId>,
    /// Ids present in a trie but not in the records.
    pub dangling: Vec<RecordId>,
}

impl VerifyReport {
    /// True if both tries match the records.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.prefix_consistent && self.suffix_consistent
    }
}

pub(crate) fn verify(state: &EngineState, max_key_chars: usize) -> VerifyReport {
    let records = state.records.list();
    let (prefix, suffix, rejected) = build_indexes(records, max_key_chars);
    let rejected: BTreeSet<RecordId> = rejected.iter().map(|err| err.id()).collect();

    let unindexed = records
        .iter()
        .filter(|r| !rejected.contains(&r.id))
        .filter(|r| !state.prefix.contains(&r.name, r.id) || !state.suffix.contains(&r.phone, r.id))
        .map(|r| r.id)
        .collect();

    let known: BTreeSet<RecordId> = records.iter().map(|r| r.id).collect();
    let indexed: BTreeSet<RecordId> = state
        .prefix
        .search("")
        .union(&state.suffix.search(""))
        .copied()
        .collect();
    let dangling = indexed.difference(&known).copied().collect();

    VerifyReport {
        records: records.len(),
        prefix_consistent: state.prefix == prefix,
        suffix_consistent: state.suffix == suffix,
        unindexed,
        dangling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_KEY_CHARS;
    use crate::record::Record;

    fn populated() -> EngineState {
        let mut state = EngineState::default();
        state.apply_add(Record::new(RecordId::new(1), "Ann", "111", "")).unwrap();
        state.apply_add(Record::new(RecordId::new(2), "Bob", "222", "")).unwrap();
        state
    }

    #[test]
    fn fresh_state_is_consistent() {
        let report = verify(&populated(), DEFAULT_MAX_KEY_CHARS);
        assert!(report.is_consistent());
        assert_eq!(report.records, 2);
        assert!(report.unindexed.is_empty());
        assert!(report.dangling.is_empty());
    }

    #[test]
    fn detects_missing_and_dangling_ids() {
        let mut state = populated();
        state.prefix.delete("Bob", RecordId::new(2)).unwrap();
        state.suffix.insert("999", RecordId::new(7)).unwrap();

        let report = verify(&state, DEFAULT_MAX_KEY_CHARS);
        assert!(!report.prefix_consistent);
        assert!(!report.suffix_consistent);
        assert_eq!(report.unindexed, vec![RecordId::new(2)]);
        assert_eq!(report.dangling, vec![RecordId::new(7)]);
    }

    #[test]
    fn rejected_keys_are_not_reported() {
        let mut state = EngineState {
            prefix: crate::index::PrefixIndex::with_max_key_chars(2),
            suffix: crate::index::SuffixIndex::with_max_key_chars(2),
            ..EngineState::default()
        };
        state.apply_add(Record::new(RecordId::new(1), "Ann", "11", "")).unwrap();

        let report = verify(&state, 2);
        assert!(report.is_consistent());
        assert!(report.unindexed.is_empty());
    }
}
