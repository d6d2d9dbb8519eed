// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Protocol constants.

/// Version of the hashing protocol described in `hash`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Hash used wherever "no previous hash" must be expressed.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Merkle root of a block carrying no data entries.
pub const EMPTY_MERKLE_ROOT: &str = ZERO_HASH;

/// Fixed genesis timestamp, so the genesis block hash is a constant.
pub const GENESIS_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// Name of the L0 entity carrying the self-describing allow-list.
pub const GOVERNANCE_ENTITY_ID: &str = "l0_governance";

/// Domain tags, one per hashed structure.
pub const BLOCK_DOMAIN: &[u8] = b"strata:block:v1";
pub const MANIFEST_DOMAIN: &[u8] = b"strata:manifest:v1";
pub const SNAPSHOT_DOMAIN: &[u8] = b"strata:snapshot:v1";
pub const FINGERPRINT_DOMAIN: &[u8] = b"strata:fingerprint:v1";

/// Merkle node prefixes.
pub const MERKLE_LEAF_PREFIX: u8 = 0x00;
pub const MERKLE_NODE_PREFIX: u8 = 0x01;
