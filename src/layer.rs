// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Governance layers and recording modes.

use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Governance tier of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Self-referential rules. Most restricted.
    L0,
    /// Durable knowledge.
    L1,
    /// Scratch context.
    L2,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::L0, Layer::L1, Layer::L2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L0 => "L0",
            Layer::L1 => "L1",
            Layer::L2 => "L2",
        }
    }

    /// Lower-case directory name used by on-disk layer sources.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Layer::L0 => "l0",
            Layer::L1 => "l1",
            Layer::L2 => "l2",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L0" | "l0" => Ok(Layer::L0),
            "L1" | "l1" => Ok(Layer::L1),
            "L2" | "l2" => Ok(Layer::L2),
            other => Err(KernelError::UnknownLayer(other.to_string())),
        }
    }
}

/// How much of a mutation the ledger must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Complete before/after content plus hashes.
    Full,
    /// Only the `prev_hash` / `next_hash` pair.
    HashOnly,
    /// No ledger entry; still tracked as a pending change.
    None,
}

impl RecordingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingMode::Full => "full",
            RecordingMode::HashOnly => "hash_only",
            RecordingMode::None => "none",
        }
    }

    pub fn writes_ledger(&self) -> bool {
        !matches!(self, RecordingMode::None)
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingMode {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(RecordingMode::Full),
            "hash_only" => Ok(RecordingMode::HashOnly),
            "none" => Ok(RecordingMode::None),
            other => Err(KernelError::UnknownRecordingMode(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPolicy {
    pub mutable: bool,
    pub blockchain_mode: RecordingMode,
}

impl LayerPolicy {
    pub const fn new(mutable: bool, blockchain_mode: RecordingMode) -> Self {
        Self { mutable, blockchain_mode }
    }
}
