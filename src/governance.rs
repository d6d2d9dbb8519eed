// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Governance Policy
//!
//! A pure lookup from layer to `{mutable, blockchain_mode}` plus the
//! allow-list of entity ids permitted in L0. No mutable state.
//!
//! The allow-list itself is governed: it can be replaced at runtime by the
//! self-describing `l0_governance` entity (see the node crate), and
//! `StaticPolicy` is the bootstrap fallback until that entity exists.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::config::GOVERNANCE_ENTITY_ID;
use crate::layer::{Layer, LayerPolicy, RecordingMode};

pub const DEFAULT_L0_ALLOW_LIST: [&str; 8] = [
    "core_safety",
    "evolution_rules",
    "layer_awareness",
    "approval_workflow",
    "self_inspection",
    "chain_awareness",
    "audit_rules",
    GOVERNANCE_ENTITY_ID,
];

/// Where the active allow-list came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOrigin {
    Static,
    SelfDescribing,
}

pub trait GovernancePolicy: Send + Sync {
    fn policy_for(&self, layer: Layer) -> LayerPolicy;

    fn l0_allow_list(&self) -> &[String];

    fn origin(&self) -> PolicyOrigin;

    fn is_allowed_in_l0(&self, entity_id: &str) -> bool {
        self.l0_allow_list().iter().any(|id| id == entity_id)
    }
}

/// Layer table used when nothing overrides it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTable {
    pub l0: LayerPolicy,
    pub l1: LayerPolicy,
    pub l2: LayerPolicy,
}

impl LayerTable {
    pub fn get(&self, layer: Layer) -> LayerPolicy {
        match layer {
            Layer::L0 => self.l0,
            Layer::L1 => self.l1,
            Layer::L2 => self.l2,
        }
    }

    pub fn set(&mut self, layer: Layer, policy: LayerPolicy) {
        match layer {
            Layer::L0 => self.l0 = policy,
            Layer::L1 => self.l1 = policy,
            Layer::L2 => self.l2 = policy,
        }
    }
}

impl Default for LayerTable {
    fn default() -> Self {
        Self {
            l0: LayerPolicy::new(true, RecordingMode::Full),
            l1: LayerPolicy::new(true, RecordingMode::HashOnly),
            l2: LayerPolicy::new(true, RecordingMode::None),
        }
    }
}

/// The bootstrap policy: a fixed table and a fixed allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticPolicy {
    table: LayerTable,
    allow_list: Vec<String>,
}

impl StaticPolicy {
    pub fn new(table: LayerTable, allow_list: Vec<String>) -> Self {
        Self { table, allow_list }
    }

    pub fn with_table(table: LayerTable) -> Self {
        Self { table, ..Self::default() }
    }

    pub fn table(&self) -> LayerTable {
        self.table
    }
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self {
            table: LayerTable::default(),
            allow_list: DEFAULT_L0_ALLOW_LIST.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl GovernancePolicy for StaticPolicy {
    fn policy_for(&self, layer: Layer) -> LayerPolicy {
        self.table.get(layer)
    }

    fn l0_allow_list(&self) -> &[String] {
        &self.allow_list
    }

    fn origin(&self) -> PolicyOrigin {
        PolicyOrigin::Static
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowListError {
    Empty,
    InvalidId(String),
    MissingSelf,
}

impl fmt::Display for AllowListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowListError::Empty => f.write_str("allow-list is empty"),
            AllowListError::InvalidId(id) => write!(f, "invalid entity id '{}' in allow-list", id),
            AllowListError::MissingSelf => {
                write!(f, "allow-list must contain '{}'", GOVERNANCE_ENTITY_ID)
            }
        }
    }
}

/// Entity ids are `[a-z0-9_]+`.
pub fn is_valid_entity_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_'))
}

/// A self-describing allow-list must be non-empty, well formed, and keep the
/// governance entity itself reachable.
pub fn validate_allow_list(ids: &[String]) -> Result<(), AllowListError> {
    if ids.is_empty() {
        return Err(AllowListError::Empty);
    }
    if let Some(bad) = ids.iter().find(|id| !is_valid_entity_id(id)) {
        return Err(AllowListError::InvalidId(bad.clone()));
    }
    if !ids.iter().any(|id| id == GOVERNANCE_ENTITY_ID) {
        return Err(AllowListError::MissingSelf);
    }
    Ok(())
}
