// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Content-addressed snapshots of all three layers.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::change::{ChangeAction, PendingChange};
use crate::config::SNAPSHOT_DOMAIN;
use crate::error::KernelError;
use crate::hash::CanonicalHasher;
use crate::layer::Layer;
use crate::manifest::{LayerDiff, LayerManifests};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitType {
    Explicit,
    Auto,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Explicit => "explicit",
            CommitType::Auto => "auto",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(CommitType::Explicit),
            "auto" => Ok(CommitType::Auto),
            other => Err(KernelError::UnknownCommitType(other.to_string())),
        }
    }
}

/// Human-readable commit counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub l0_changed: u64,
    pub l1_added: u64,
    pub l1_modified: u64,
    pub l1_deleted: u64,
    pub l2_changed: u64,
    pub promotions: u64,
    pub pending_total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    #[serde(rename = "L0")]
    pub l0: LayerDiff,
    #[serde(rename = "L1")]
    pub l1: LayerDiff,
    #[serde(rename = "L2")]
    pub l2: LayerDiff,
    pub summary: DiffSummary,
}

impl SnapshotDiff {
    /// Per-layer set difference plus summary counts.
    pub fn between(
        previous: Option<&LayerManifests>,
        current: &LayerManifests,
        changes: &[PendingChange],
    ) -> Self {
        let layer_diff = |layer: Layer| current.get(layer).diff_from(previous.map(|p| p.get(layer)));
        let l0 = layer_diff(Layer::L0);
        let l1 = layer_diff(Layer::L1);
        let l2 = layer_diff(Layer::L2);

        let summary = DiffSummary {
            l0_changed: l0.changed(),
            l1_added: l1.added.len() as u64,
            l1_modified: l1.modified.len() as u64,
            l1_deleted: l1.removed.len() as u64,
            l2_changed: l2.changed(),
            promotions: changes
                .iter()
                .filter(|c| c.action == ChangeAction::Promote)
                .count() as u64,
            pending_total: changes.len() as u64,
        };

        Self { l0, l1, l2, summary }
    }

    pub fn get(&self, layer: Layer) -> &LayerDiff {
        match layer {
            Layer::L0 => &self.l0,
            Layer::L1 => &self.l1,
            Layer::L2 => &self.l2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.l0.is_empty() && self.l1.is_empty() && self.l2.is_empty()
    }
}

/// A frozen view of all layers at commit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_hash: String,
    pub created_at: String,
    pub commit_type: CommitType,
    pub created_by: String,
    pub reason: String,
    pub layers: LayerManifests,
    pub changes_since_last: Vec<PendingChange>,
    pub diff: SnapshotDiff,
    /// Index of the commit block that recorded this snapshot.
    #[serde(default)]
    pub block_index: Option<u64>,
}

impl Snapshot {
    pub fn new(
        created_at: String,
        commit_type: CommitType,
        created_by: String,
        reason: String,
        layers: LayerManifests,
        changes_since_last: Vec<PendingChange>,
        diff: SnapshotDiff,
    ) -> Self {
        let snapshot_hash =
            compute_snapshot_hash(&layers, &created_at, commit_type, &created_by, &reason);
        Self {
            snapshot_hash,
            created_at,
            commit_type,
            created_by,
            reason,
            layers,
            changes_since_last,
            diff,
            block_index: None,
        }
    }

    pub fn recompute_hash(&self) -> String {
        compute_snapshot_hash(
            &self.layers,
            &self.created_at,
            self.commit_type,
            &self.created_by,
            &self.reason,
        )
    }

    /// Stored hash and every manifest hash still match their contents.
    pub fn is_consistent(&self) -> bool {
        let manifests_ok = Layer::ALL.iter().all(|layer| {
            let manifest = self.layers.get(*layer);
            manifest.manifest_hash == crate::manifest::manifest_hash(&manifest.entities)
                && manifest.entity_count == manifest.entities.len() as u64
        });
        manifests_ok && self.snapshot_hash == self.recompute_hash()
    }
}

/// `SHA256(domain || lp(L0) || lp(L1) || lp(L2) || lp(created_at) || lp(commit_type) || lp(created_by) || lp(reason))`
pub fn compute_snapshot_hash(
    layers: &LayerManifests,
    created_at: &str,
    commit_type: CommitType,
    created_by: &str,
    reason: &str,
) -> String {
    let mut hasher = CanonicalHasher::new(SNAPSHOT_DOMAIN);
    for layer in Layer::ALL {
        hasher.write_str(&layers.get(layer).manifest_hash);
    }
    hasher.write_str(created_at);
    hasher.write_str(commit_type.as_str());
    hasher.write_str(created_by);
    hasher.write_str(reason);
    hasher.finish_hex()
}
