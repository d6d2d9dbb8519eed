// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical SHA-256 Hashing
//!
//! Every externally visible Strata hash (blocks, merkle roots, manifests,
//! snapshots) goes through this module so a third party can re-derive it.
//!
//! # Encoding
//! - integers are fed as `u64` little endian
//! - variable length fields are length prefixed: `u64_le(len) || bytes`
//! - each hashed structure starts with its own domain tag (see `config`)
//! - digests are rendered as 64 lowercase hex characters

use alloc::string::String;
use sha2::{Digest, Sha256};

use crate::error::{KernelError, KernelResult};

/// Incremental hasher enforcing the canonical field encoding.
pub struct CanonicalHasher {
    inner: Sha256,
}

impl CanonicalHasher {
    /// Start a hash over a structure identified by `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    pub fn write_u64(&mut self, val: u64) {
        self.inner.update(val.to_le_bytes());
    }

    /// Length-prefixed byte field.
    pub fn write_field(&mut self, bytes: &[u8]) {
        self.write_u64(bytes.len() as u64);
        self.inner.update(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_field(s.as_bytes());
    }

    pub fn finish(self) -> [u8; 32] {
        self.inner.finalize().into()
    }

    pub fn finish_hex(self) -> String {
        to_hex(&self.finish())
    }
}

/// Raw SHA-256 of a byte slice.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 of `prefix || parts...`, used by the merkle tree.
pub fn sha256_prefixed(prefix: u8, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([prefix]);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Content hash of a layer entity.
pub fn content_hash(content: &[u8]) -> String {
    to_hex(&sha256(content))
}

pub fn to_hex(digest: &[u8; 32]) -> String {
    hex::encode(digest)
}

/// Parse a 64 character hex digest back to raw bytes.
pub fn decode_digest(digest: &str) -> KernelResult<[u8; 32]> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(digest, &mut out)
        .map_err(|_| KernelError::MalformedDigest(String::from(digest)))?;
    Ok(out)
}

pub fn is_digest(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
