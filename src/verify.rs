// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain verification.
//!
//! Walks a chain from genesis to tip and recomputes every derived field:
//! - stored genesis == canonical genesis
//! - `block[i].index == i`
//! - `block[i].merkle_root` == merkle root of `block[i].data`
//! - `block[i].hash` == hash of the stored fields
//! - `block[i].previous_hash == block[i-1].hash`
//!
//! Verification stops at the first mismatch. Nothing is repaired.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::block::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GenesisMismatch,
    IndexMismatch,
    MerkleMismatch,
    HashMismatch,
    LinkMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FailureKind::GenesisMismatch => "genesis block differs from the canonical genesis",
            FailureKind::IndexMismatch => "block index out of sequence",
            FailureKind::MerkleMismatch => "merkle root does not match block data",
            FailureKind::HashMismatch => "block hash does not match block fields",
            FailureKind::LinkMismatch => "previous_hash does not match the preceding block",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFailure {
    pub index: u64,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub valid: bool,
    pub length: u64,
    pub failure: Option<ChainFailure>,
}

/// Verify a full chain. An empty chain is valid.
pub fn verify_chain(blocks: &[Block]) -> ChainReport {
    let length = blocks.len() as u64;
    match first_failure(blocks) {
        Some(failure) => ChainReport { valid: false, length, failure: Some(failure) },
        None => ChainReport { valid: true, length, failure: None },
    }
}

pub fn is_valid_chain(blocks: &[Block]) -> bool {
    first_failure(blocks).is_none()
}

fn first_failure(blocks: &[Block]) -> Option<ChainFailure> {
    let fail = |index: u64, kind: FailureKind| Some(ChainFailure { index, kind });

    let first = blocks.first()?;
    if *first != Block::genesis() {
        return fail(first.index, FailureKind::GenesisMismatch);
    }

    for (position, block) in blocks.iter().enumerate() {
        if block.index != position as u64 {
            return fail(block.index, FailureKind::IndexMismatch);
        }
        if block.merkle_root != block.recompute_merkle_root() {
            return fail(block.index, FailureKind::MerkleMismatch);
        }
        if block.hash != block.recompute_hash() {
            return fail(block.index, FailureKind::HashMismatch);
        }
        if position > 0 && block.previous_hash != blocks[position - 1].hash {
            return fail(block.index, FailureKind::LinkMismatch);
        }
    }

    None
}
