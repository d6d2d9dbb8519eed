// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger blocks.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::config::{BLOCK_DOMAIN, EMPTY_MERKLE_ROOT, GENESIS_TIMESTAMP, ZERO_HASH};
use crate::hash::CanonicalHasher;
use crate::merkle::merkle_root;

/// One immutable ledger entry.
///
/// The field order matches the persisted JSON shape:
/// `{index, timestamp, data, previous_hash, merkle_root, hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub data: Vec<String>,
    pub previous_hash: String,
    pub merkle_root: String,
    pub hash: String,
}

impl Block {
    /// Build a sealed block: merkle root and hash are computed here and never again.
    pub fn new(index: u64, timestamp: String, data: Vec<String>, previous_hash: String) -> Self {
        let merkle_root = merkle_root(&data);
        let hash = compute_block_hash(index, &timestamp, &data, &previous_hash, &merkle_root);
        Self {
            index,
            timestamp,
            data,
            previous_hash,
            merkle_root,
            hash,
        }
    }

    /// The canonical genesis block. Every field is a protocol constant.
    pub fn genesis() -> Self {
        let block = Self::new(0, GENESIS_TIMESTAMP.to_string(), Vec::new(), ZERO_HASH.to_string());
        debug_assert_eq!(block.merkle_root, EMPTY_MERKLE_ROOT);
        block
    }

    /// Successor of `self` carrying `data`.
    pub fn next(&self, timestamp: String, data: Vec<String>) -> Self {
        Self::new(self.index + 1, timestamp, data, self.hash.clone())
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn recompute_merkle_root(&self) -> String {
        merkle_root(&self.data)
    }

    /// Hash over the stored fields, including the stored merkle root.
    pub fn recompute_hash(&self) -> String {
        compute_block_hash(
            self.index,
            &self.timestamp,
            &self.data,
            &self.previous_hash,
            &self.merkle_root,
        )
    }

    /// `type` field of every data entry that is a JSON object carrying one.
    pub fn record_types(&self) -> Vec<String> {
        self.data
            .iter()
            .filter_map(|entry| serde_json::from_str::<serde_json::Value>(entry).ok())
            .filter_map(|value| value.get("type").and_then(|t| t.as_str()).map(|t| t.to_string()))
            .collect()
    }

    pub fn has_record_type(&self, record_type: &str) -> bool {
        self.record_types().iter().any(|t| t == record_type)
    }
}

/// `SHA256(domain || u64(index) || lp(timestamp) || u64(n) || lp(data_i).. || lp(previous_hash) || lp(merkle_root))`
pub fn compute_block_hash(
    index: u64,
    timestamp: &str,
    data: &[String],
    previous_hash: &str,
    merkle_root: &str,
) -> String {
    let mut hasher = CanonicalHasher::new(BLOCK_DOMAIN);
    hasher.write_u64(index);
    hasher.write_str(timestamp);
    hasher.write_u64(data.len() as u64);
    for entry in data {
        hasher.write_str(entry);
    }
    hasher.write_str(previous_hash);
    hasher.write_str(merkle_root);
    hasher.finish_hex()
}
