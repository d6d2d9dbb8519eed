// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pending changes awaiting the next commit.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::KernelError;
use crate::layer::Layer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    /// Move an entity up a layer (L2 -> L1, L1 -> L0).
    Promote,
}

impl ChangeAction {
    pub const ALL: [ChangeAction; 4] = [
        ChangeAction::Create,
        ChangeAction::Update,
        ChangeAction::Delete,
        ChangeAction::Promote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
            ChangeAction::Promote => "promote",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeAction::Create),
            "update" => Ok(ChangeAction::Update),
            "delete" => Ok(ChangeAction::Delete),
            "promote" => Ok(ChangeAction::Promote),
            other => Err(KernelError::UnknownAction(other.to_string())),
        }
    }
}

/// A mutation recorded since the last commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub layer: Layer,
    pub action: ChangeAction,
    pub entity_id: String,
    pub reason: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub recorded_at: String,
}

impl PendingChange {
    pub fn new(
        layer: Layer,
        action: ChangeAction,
        entity_id: impl Into<String>,
        reason: impl Into<String>,
        recorded_at: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            action,
            entity_id: entity_id.into(),
            reason: reason.into(),
            metadata: Map::new(),
            recorded_at: recorded_at.into(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
