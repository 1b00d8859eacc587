//! Index snapshot encoding.
//!
//! ## Format
//!
//! ```text
//! | magic "CIDX" (4) | version (1) | CBOR body |
//!
//! body = {
//!     generation: u64,          // must match the records snapshot
//!     prefix: [FlatNode],       // pre-order, nodes[0] is the root
//!     suffix: [FlatNode],
//! }
//! FlatNode = { parent: u32, ch: char, terminal: bool, ids: [u64] }
//! ```
//!
//! Nodes are flattened so decoding depth is bounded regardless of key
//! length. Every non-root node's `parent` points at an earlier node.
//!
//! ## Invariants
//!
//! - Index state is derivable from the records snapshot + WAL
//! - Decoding failures trigger a rebuild, not an open failure

use super::trie::{CharTrie, KeyOrder, TrieNode};
use super::{PrefixIndex, SuffixIndex};
use crate::error::{CoreError, CoreResult};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// Magic bytes for index snapshots: "CIDX".
const INDEX_MAGIC: [u8; 4] = *b"CIDX";

/// Current index snapshot format version.
const INDEX_VERSION: u8 = 1;

const HEADER_SIZE: usize = INDEX_MAGIC.len() + 1;

#[derive(Debug, Serialize, Deserialize)]
struct FlatNode {
    parent: u32,
    ch: char,
    terminal: bool,
    ids: Vec<RecordId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    generation: u64,
    prefix: Vec<FlatNode>,
    suffix: Vec<FlatNode>,
}

/// Indexes restored from a snapshot.
#[derive(Debug)]
pub struct DecodedIndexes {
    /// Generation of the records snapshot these indexes were written with.
    pub generation: u64,
    /// Name trie.
    pub prefix: PrefixIndex,
    /// Phone trie.
    pub suffix: SuffixIndex,
}

/// Serializes both indexes, tagged with the snapshot `generation`.
///
/// # Errors
///
/// Returns an error if the trie has more nodes than the format can address
/// or CBOR encoding fails.
pub fn encode_indexes(
    generation: u64,
    prefix: &PrefixIndex,
    suffix: &SuffixIndex,
) -> CoreResult<Vec<u8>> {
    let file = IndexFile {
        generation,
        prefix: flatten(prefix)?,
        suffix: flatten(suffix)?,
    };

    let mut buf = Vec::with_capacity(HEADER_SIZE + 64);
    buf.extend_from_slice(&INDEX_MAGIC);
    buf.push(INDEX_VERSION);
    ciborium::ser::into_writer(&file, &mut buf)
        .map_err(|e| CoreError::invalid_format(format!("index encoding failed: {e}")))?;
    Ok(buf)
}

/// Restores both indexes from bytes produced by [`encode_indexes`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidFormat`] on a bad header, unsupported
/// version, malformed CBOR, or an inconsistent node table.
pub fn decode_indexes(data: &[u8], max_key_chars: usize) -> CoreResult<DecodedIndexes> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::invalid_format("index snapshot too small"));
    }
    if data[..INDEX_MAGIC.len()] != INDEX_MAGIC {
        return Err(CoreError::invalid_format("invalid index snapshot magic"));
    }
    let version = data[INDEX_MAGIC.len()];
    if version != INDEX_VERSION {
        return Err(CoreError::invalid_format(format!(
            "unsupported index snapshot version: {version}"
        )));
    }

    let file: IndexFile = ciborium::de::from_reader(&data[HEADER_SIZE..])
        .map_err(|e| CoreError::invalid_format(format!("index decoding failed: {e}")))?;

    Ok(DecodedIndexes {
        generation: file.generation,
        prefix: unflatten(file.prefix, max_key_chars)?,
        suffix: unflatten(file.suffix, max_key_chars)?,
    })
}

fn flatten<O: KeyOrder>(trie: &CharTrie<O>) -> CoreResult<Vec<FlatNode>> {
    let mut nodes = Vec::with_capacity(trie.node_count());
    let mut stack: Vec<(&TrieNode, u32, char)> = vec![(&trie.root, 0, '\0')];

    while let Some((node, parent, ch)) = stack.pop() {
        let index = u32::try_from(nodes.len())
            .map_err(|_| CoreError::invalid_format("index has too many nodes"))?;
        nodes.push(FlatNode {
            parent,
            ch,
            terminal: node.terminal,
            ids: node.ids.iter().copied().collect(),
        });
        for (&child_ch, child) in node.children.iter().rev() {
            stack.push((child, index, child_ch));
        }
    }

    Ok(nodes)
}

fn unflatten<O: KeyOrder>(flat: Vec<FlatNode>, max_key_chars: usize) -> CoreResult<CharTrie<O>> {
    if flat.is_empty() {
        return Ok(CharTrie::with_max_key_chars(max_key_chars));
    }

    let parents: Vec<(usize, char)> = flat
        .iter()
        .map(|n| (n.parent as usize, n.ch))
        .collect();
    let mut nodes: Vec<Option<TrieNode>> = flat
        .into_iter()
        .map(|n| {
            Some(TrieNode {
                children: Default::default(),
                terminal: n.terminal,
                ids: n.ids.into_iter().collect(),
            })
        })
        .collect();

    // Children always follow their parent, so attaching from the back
    // completes each subtree before it is moved.
    for index in (1..nodes.len()).rev() {
        let (parent, ch) = parents[index];
        if parent >= index {
            return Err(CoreError::invalid_format(format!(
                "index node {index} has forward parent {parent}"
            )));
        }
        let node = nodes[index]
            .take()
            .ok_or_else(|| CoreError::invalid_format("index node visited twice"))?;
        let parent_node = nodes[parent]
            .as_mut()
            .ok_or_else(|| CoreError::invalid_format("index parent already detached"))?;
        if parent_node.children.insert(ch, node).is_some() {
            return Err(CoreError::invalid_format(format!(
                "duplicate child {ch:?} under index node {parent}"
            )));
        }
    }

    let root = nodes[0]
        .take()
        .ok_or_else(|| CoreError::invalid_format("index root missing"))?;
    Ok(CharTrie::from_root(root, max_key_chars))
}
