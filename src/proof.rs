// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain Proof Receipts.
//!
//! A compact receipt that two auditors can compare to agree they hold the
//! same chain without exchanging it.
//!
//! # Guarantee
//! Same blocks in the same order → same proof.

use alloc::string::String;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::config::{FINGERPRINT_DOMAIN, PROTOCOL_VERSION, ZERO_HASH};
use crate::verify::{verify_chain, ChainReport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainProof {
    /// Version of the hashing protocol.
    pub protocol_version: u32,

    /// Number of blocks, genesis included.
    pub length: u64,

    pub genesis_hash: String,

    pub tip_index: u64,

    pub tip_hash: String,

    /// BLAKE3 over the domain tag and every block hash in order.
    pub chain_fingerprint: String,
}

impl ChainProof {
    /// Build a receipt over `blocks`. The chain is not verified here.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN);
        for block in blocks {
            hasher.update(&(block.hash.len() as u64).to_le_bytes());
            hasher.update(block.hash.as_bytes());
        }

        let (tip_index, tip_hash) = match blocks.last() {
            Some(tip) => (tip.index, tip.hash.clone()),
            None => (0, String::from(ZERO_HASH)),
        };

        Self {
            protocol_version: PROTOCOL_VERSION,
            length: blocks.len() as u64,
            genesis_hash: blocks
                .first()
                .map(|b| b.hash.clone())
                .unwrap_or_else(|| String::from(ZERO_HASH)),
            tip_index,
            tip_hash,
            chain_fingerprint: String::from(hasher.finalize().to_hex().as_str()),
        }
    }

    /// Verify the chain and build the receipt in one pass.
    pub fn audit(blocks: &[Block]) -> (ChainReport, Self) {
        (verify_chain(blocks), Self::from_blocks(blocks))
    }

    /// Two proofs describe the same chain.
    pub fn matches(&self, other: &ChainProof) -> bool {
        self.protocol_version == other.protocol_version
            && self.length == other.length
            && self.tip_hash == other.tip_hash
            && self.chain_fingerprint == other.chain_fingerprint
    }
}
