//! Owned character trie with per-node id sets.

use crate::config::DEFAULT_MAX_KEY_CHARS;
use crate::error::IndexError;
use crate::types::RecordId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

/// Direction in which a trie consumes its keys.
pub trait KeyOrder: fmt::Debug + Send + Sync + 'static {
    /// Short name used in logs and errors.
    const NAME: &'static str;

    /// Returns the characters of `key` in walk order.
    fn path(key: &str) -> Vec<char>;
}

/// Walks keys front-to-back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Forward;

/// Walks keys back-to-front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backward;

impl KeyOrder for Forward {
    const NAME: &'static str = "prefix";

    fn path(key: &str) -> Vec<char> {
        key.chars().collect()
    }
}

impl KeyOrder for Backward {
    const NAME: &'static str = "suffix";

    fn path(key: &str) -> Vec<char> {
        key.chars().rev().collect()
    }
}

/// Trie over names, answering "which records have a name starting with".
pub type PrefixIndex = CharTrie<Forward>;

/// Trie over phone numbers, answering "which records have a phone ending in".
pub type SuffixIndex = CharTrie<Backward>;

/// A trie node. Parent owns children; there are no back links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TrieNode {
    pub(crate) children: BTreeMap<char, TrieNode>,
    pub(crate) terminal: bool,
    pub(crate) ids: BTreeSet<RecordId>,
}

impl TrieNode {
    /// True if some id in this node's set has its key end exactly here.
    ///
    /// Each child's ids are a subset of its parent's, so an id that no
    /// child carries must terminate at this node.
    fn has_key_ending_here(&self) -> bool {
        self.ids
            .iter()
            .any(|id| !self.children.values().any(|child| child.ids.contains(id)))
    }

    /// True if `id`'s key ends exactly at this node rather than passing
    /// through it.
    fn key_ends_here(&self, id: RecordId) -> bool {
        self.ids.contains(&id) && !self.children.values().any(|child| child.ids.contains(&id))
    }

    fn is_prunable(&self) -> bool {
        self.children.is_empty() && !self.terminal
    }
}

/// A character trie mapping key prefixes (in `O`'s walk order) to record ids.
///
/// The root sits at depth zero and accumulates every inserted id, so an
/// empty query matches everything. The root is never pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharTrie<O: KeyOrder> {
    pub(crate) root: TrieNode,
    max_key_chars: usize,
    _order: PhantomData<O>,
}

impl<O: KeyOrder> Default for CharTrie<O> {
    fn default() -> Self {
        Self::with_max_key_chars(DEFAULT_MAX_KEY_CHARS)
    }
}

impl<O: KeyOrder> CharTrie<O> {
    /// Creates an empty trie with the default key length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty trie that rejects keys longer than `max_key_chars`.
    #[must_use]
    pub fn with_max_key_chars(max_key_chars: usize) -> Self {
        Self {
            root: TrieNode::default(),
            max_key_chars,
            _order: PhantomData,
        }
    }

    pub(crate) fn from_root(root: TrieNode, max_key_chars: usize) -> Self {
        Self {
            root,
            max_key_chars,
            _order: PhantomData,
        }
    }

    /// The configured key length limit.
    #[must_use]
    pub fn max_key_chars(&self) -> usize {
        self.max_key_chars
    }

    /// Indexes `key` for `id`.
    ///
    /// Every node on the path gains `id`; the last node is marked terminal.
    /// Inserting the same pair twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::KeyTooLong`] and leaves the trie unchanged if
    /// the key exceeds the limit.
    pub fn insert(&mut self, key: &str, id: RecordId) -> Result<(), IndexError> {
        let path = self.checked_path(key, id)?;

        let mut node = &mut self.root;
        node.ids.insert(id);
        for ch in path {
            node = node.children.entry(ch).or_default();
            node.ids.insert(id);
        }
        node.terminal = true;
        Ok(())
    }

    /// Returns the ids of every key that starts (in walk order) with `key`.
    ///
    /// An unknown path yields an empty set.
    #[must_use]
    pub fn search(&self, key: &str) -> BTreeSet<RecordId> {
        self.find(&O::path(key))
            .map(|node| node.ids.clone())
            .unwrap_or_default()
    }

    /// Returns true if `key` was inserted for `id` and is still present.
    #[must_use]
    pub fn contains(&self, key: &str, id: RecordId) -> bool {
        self.find(&O::path(key))
            .is_some_and(|node| node.terminal && node.key_ends_here(id))
    }

    /// Removes `id` from every node on `key`'s path and prunes nodes that
    /// end up childless and non-terminal, leaf first.
    ///
    /// The leaf stays terminal while another id still ends there. Deleting
    /// a key that is not in the trie is a no-op. Returns true if `id` was
    /// removed from the leaf.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::KeyTooLong`] for keys over the limit, which can
    /// never have been inserted.
    pub fn delete(&mut self, key: &str, id: RecordId) -> Result<bool, IndexError> {
        let path = self.checked_path(key, id)?;

        let present = self.find(&path).is_some_and(|node| node.key_ends_here(id));
        if !present {
            return Ok(false);
        }

        // The root's prune verdict is ignored.
        delete_along(&mut self.root, &path, id);
        Ok(true)
    }

    /// Number of distinct ids in the trie.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.ids.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.ids.is_empty() && self.root.children.is_empty()
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values());
        }
        count
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.root = TrieNode::default();
    }

    fn checked_path(&self, key: &str, id: RecordId) -> Result<Vec<char>, IndexError> {
        let path = O::path(key);
        if path.len() > self.max_key_chars {
            return Err(IndexError::KeyTooLong {
                index: O::NAME,
                id,
                chars: path.len(),
                max: self.max_key_chars,
            });
        }
        Ok(path)
    }

    fn find(&self, path: &[char]) -> Option<&TrieNode> {
        let mut node = &self.root;
        for ch in path {
            node = node.children.get(ch)?;
        }
        Some(node)
    }
}

/// Removes `id` along `path` below `node`. Returns true if `node` itself
/// should be pruned by its parent.
fn delete_along(node: &mut TrieNode, path: &[char], id: RecordId) -> bool {
    match path.split_first() {
        None => {
            node.ids.remove(&id);
            node.terminal = node.has_key_ending_here();
        }
        Some((ch, rest)) => {
            if let Some(child) = node.children.get_mut(ch) {
                if delete_along(child, rest, id) {
                    node.children.remove(ch);
                }
            }
            node.ids.remove(&id);
        }
    }
    node.is_prunable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[u64]) -> BTreeSet<RecordId> {
        raw.iter().copied().map(RecordId::new).collect()
    }

    #[test]
    fn prefix_search_returns_all_extensions() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.insert("Anna", RecordId::new(2)).unwrap();
        trie.insert("Bob", RecordId::new(3)).unwrap();

        assert_eq!(trie.search("An"), ids(&[1, 2]));
        assert_eq!(trie.search("Ann"), ids(&[1, 2]));
        assert_eq!(trie.search("Anna"), ids(&[2]));
        assert!(trie.search("Annie").is_empty());
        assert!(trie.search("X").is_empty());
    }

    #[test]
    fn suffix_search_walks_backwards() {
        let mut trie = SuffixIndex::new();
        trie.insert("5551234", RecordId::new(1)).unwrap();
        trie.insert("5559234", RecordId::new(2)).unwrap();

        assert_eq!(trie.search("234"), ids(&[1, 2]));
        assert_eq!(trie.search("1234"), ids(&[1]));
        assert!(trie.search("555").is_empty());
    }

    #[test]
    fn empty_query_matches_everything() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.insert("Bob", RecordId::new(2)).unwrap();

        assert_eq!(trie.search(""), ids(&[1, 2]));
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn empty_key_marks_root_terminal() {
        let mut trie = PrefixIndex::new();
        trie.insert("", RecordId::new(4)).unwrap();

        assert!(trie.contains("", RecordId::new(4)));
        assert_eq!(trie.node_count(), 1);

        assert!(trie.delete("", RecordId::new(4)).unwrap());
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        let once = trie.clone();
        trie.insert("Ann", RecordId::new(1)).unwrap();

        assert_eq!(trie, once);
    }

    #[test]
    fn delete_prunes_dead_branch() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.insert("Al", RecordId::new(2)).unwrap();
        assert_eq!(trie.node_count(), 5);

        assert!(trie.delete("Ann", RecordId::new(1)).unwrap());
        // root, A, l
        assert_eq!(trie.node_count(), 3);
        assert!(trie.search("An").is_empty());
        assert_eq!(trie.search("A"), ids(&[2]));
    }

    #[test]
    fn delete_keeps_shared_terminal() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.insert("Ann", RecordId::new(2)).unwrap();

        trie.delete("Ann", RecordId::new(1)).unwrap();
        assert_eq!(trie.search("Ann"), ids(&[2]));
        assert!(trie.contains("Ann", RecordId::new(2)));
        assert!(!trie.contains("Ann", RecordId::new(1)));
    }

    #[test]
    fn delete_inner_key_keeps_longer_key() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.insert("Anna", RecordId::new(2)).unwrap();

        trie.delete("Ann", RecordId::new(1)).unwrap();
        assert_eq!(trie.search("Ann"), ids(&[2]));
        assert!(!trie.contains("Ann", RecordId::new(2)));
        assert!(trie.contains("Anna", RecordId::new(2)));
    }

    #[test]
    fn delete_unknown_key_or_id_is_noop() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        let before = trie.clone();

        assert!(!trie.delete("Annie", RecordId::new(1)).unwrap());
        assert!(!trie.delete("Ann", RecordId::new(9)).unwrap());
        assert!(!trie.delete("An", RecordId::new(9)).unwrap());
        assert!(!trie.delete("An", RecordId::new(1)).unwrap());
        assert!(!trie.contains("An", RecordId::new(1)));
        assert_eq!(trie, before);
    }

    #[test]
    fn long_keys_are_rejected() {
        let mut trie = SuffixIndex::with_max_key_chars(3);
        let err = trie.insert("12345", RecordId::new(1)).unwrap_err();

        assert_eq!(
            err,
            IndexError::KeyTooLong {
                index: "suffix",
                id: RecordId::new(1),
                chars: 5,
                max: 3,
            }
        );
        assert!(trie.is_empty());
        assert!(trie.delete("12345", RecordId::new(1)).is_err());
    }

    #[test]
    fn keys_are_counted_in_chars_not_bytes() {
        let mut trie = PrefixIndex::with_max_key_chars(2);
        trie.insert("李四", RecordId::new(1)).unwrap();

        assert_eq!(trie.search("李"), ids(&[1]));
    }

    #[test]
    fn clear_empties_trie() {
        let mut trie = PrefixIndex::new();
        trie.insert("Ann", RecordId::new(1)).unwrap();
        trie.clear();

        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
    }

    proptest! {
        #[test]
        fn every_prefix_finds_its_key(keys in prop::collection::vec("[a-c]{0,6}", 1..20)) {
            let mut trie = PrefixIndex::new();
            for (i, key) in keys.iter().enumerate() {
                trie.insert(key, RecordId::new(i as u64 + 1)).unwrap();
            }

            for (i, key) in keys.iter().enumerate() {
                let id = RecordId::new(i as u64 + 1);
                let chars: Vec<char> = key.chars().collect();
                for end in 0..=chars.len() {
                    let prefix: String = chars[..end].iter().collect();
                    prop_assert!(trie.search(&prefix).contains(&id));
                }
            }
        }

        #[test]
        fn deleting_everything_leaves_bare_root(keys in prop::collection::vec("[0-3]{0,5}", 1..20)) {
            let mut trie = SuffixIndex::new();
            for (i, key) in keys.iter().enumerate() {
                trie.insert(key, RecordId::new(i as u64 + 1)).unwrap();
            }
            for (i, key) in keys.iter().enumerate() {
                trie.delete(key, RecordId::new(i as u64 + 1)).unwrap();
            }

            prop_assert!(trie.is_empty());
            prop_assert_eq!(trie.node_count(), 1);
        }
    }
}
