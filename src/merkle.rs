// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Merkle root over a block's data entries.
//!
//! ```text
//! leaf  = SHA256(0x00 || entry)
//! node  = SHA256(0x01 || left || right)
//! odd   = last node paired with itself
//! empty = EMPTY_MERKLE_ROOT
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::config::{EMPTY_MERKLE_ROOT, MERKLE_LEAF_PREFIX, MERKLE_NODE_PREFIX};
use crate::hash::{sha256_prefixed, to_hex};

pub fn leaf_hash(entry: &str) -> [u8; 32] {
    sha256_prefixed(MERKLE_LEAF_PREFIX, &[entry.as_bytes()])
}

pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    sha256_prefixed(MERKLE_NODE_PREFIX, &[left.as_slice(), right.as_slice()])
}

/// Raw merkle root, `None` for empty data.
pub fn merkle_root_raw<S: AsRef<str>>(entries: &[S]) -> Option<[u8; 32]> {
    if entries.is_empty() {
        return None;
    }

    let mut level: Vec<[u8; 32]> = entries.iter().map(|e| leaf_hash(e.as_ref())).collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            next.push(node_hash(left, right));
        }
        level = next;
    }

    Some(level[0])
}

/// Hex merkle root as stored in a block.
pub fn merkle_root<S: AsRef<str>>(entries: &[S]) -> String {
    match merkle_root_raw(entries) {
        Some(root) => to_hex(&root),
        None => EMPTY_MERKLE_ROOT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_constant() {
        let empty: [&str; 0] = [];
        assert_eq!(merkle_root(&empty), EMPTY_MERKLE_ROOT);
    }

    #[test]
    fn test_single_entry_is_leaf() {
        assert_eq!(merkle_root(&["a"]), to_hex(&leaf_hash("a")));
    }

    #[test]
    fn test_odd_count_pairs_last_with_itself() {
        let a = leaf_hash("a");
        let b = leaf_hash("b");
        let c = leaf_hash("c");
        let expected = node_hash(&node_hash(&a, &b), &node_hash(&c, &c));
        assert_eq!(merkle_root(&["a", "b", "c"]), to_hex(&expected));
    }

    #[test]
    fn test_leaf_and_node_domains_differ() {
        // A single leaf must not collide with an inner node over the same bytes.
        let a = leaf_hash("a");
        assert_ne!(node_hash(&a, &a), a);
        assert_ne!(merkle_root(&["a", "a"]), merkle_root(&["a"]));
    }
}
