//! Character-trie indexes over record fields.
//!
//! - [`PrefixIndex`]: trie over names, walked front-to-back
//! - [`SuffixIndex`]: trie over phone numbers, walked back-to-front
//!
//! Every node on a key's path carries the ids of all records whose key
//! passes through it, so a prefix (or suffix) lookup costs one step per
//! query character and never walks a subtree.
//!
//! Indexes are derivable from the records. A missing or stale index
//! snapshot is rebuilt with [`build_indexes`], never treated as fatal.

mod persistence;
mod trie;

pub use persistence::{decode_indexes, encode_indexes, DecodedIndexes};
pub use trie::{Backward, CharTrie, Forward, KeyOrder, PrefixIndex, SuffixIndex};

use crate::error::IndexError;
use crate::record::Record;

/// Builds both indexes from scratch over `records`.
///
/// Keys the indexes reject are returned alongside; the remaining records
/// are still indexed.
#[must_use]
pub fn build_indexes(
    records: &[Record],
    max_key_chars: usize,
) -> (PrefixIndex, SuffixIndex, Vec<IndexError>) {
    let mut prefix = PrefixIndex::with_max_key_chars(max_key_chars);
    let mut suffix = SuffixIndex::with_max_key_chars(max_key_chars);
    let mut errors = Vec::new();

    for record in records {
        if let Err(err) = prefix.insert(&record.name, record.id) {
            errors.push(err);
        }
        if let Err(err) = suffix.insert(&record.phone, record.id) {
            errors.push(err);
        }
    }

    (prefix, suffix, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    #[test]
    fn build_indexes_covers_every_record() {
        let records = vec![
            Record::new(RecordId::new(1), "Ann", "5551234", ""),
            Record::new(RecordId::new(2), "Andy", "5559999", ""),
        ];

        let (prefix, suffix, errors) = build_indexes(&records, 64);
        assert!(errors.is_empty());
        assert_eq!(prefix.search("An").len(), 2);
        assert_eq!(suffix.search("1234").len(), 1);
    }

    #[test]
    fn build_indexes_reports_rejected_keys() {
        let records = vec![
            Record::new(RecordId::new(1), "Bartholomew", "12", ""),
            Record::new(RecordId::new(2), "Bo", "34", ""),
        ];

        let (prefix, _, errors) = build_indexes(&records, 4);
        assert_eq!(errors.len(), 1);
        assert!(prefix.search("Bo").contains(&RecordId::new(2)));
        assert!(prefix.search("Bar").is_empty());
    }
}
