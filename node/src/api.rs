// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};
use strata_kernel::block::Block;
use strata_kernel::snapshot::{CommitType, DiffSummary, Snapshot};
use strata_kernel::verify::ChainFailure;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainStatusResponse {
    pub valid: bool,
    pub length: u64,
    pub latest_block: Block,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainVerifyResponse {
    pub valid: bool,
    pub length: u64,
    pub failure: Option<ChainFailure>,
}

#[derive(Debug, Deserialize)]
pub struct ChainHistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainHistoryResponse {
    pub count: usize,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
pub struct ChainRecordRequest {
    pub logs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainRecordResponse {
    pub block: Block,
}

#[derive(Debug, Deserialize)]
pub struct StateCommitRequest {
    pub reason: String,
    #[serde(default)]
    pub force: bool,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StateHistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub hash: Option<String>,
}

/// One line of the snapshot list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub snapshot_hash: String,
    pub created_at: String,
    pub commit_type: CommitType,
    pub created_by: String,
    pub reason: String,
    pub block_index: Option<u64>,
    pub changes: usize,
    pub summary: DiffSummary,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(s: &Snapshot) -> Self {
        Self {
            snapshot_hash: s.snapshot_hash.clone(),
            created_at: s.created_at.clone(),
            commit_type: s.commit_type,
            created_by: s.created_by.clone(),
            reason: s.reason.clone(),
            block_index: s.block_index,
            changes: s.changes_since_last.len(),
            summary: s.diff.summary.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateHistoryResponse {
    Snapshot(Box<Snapshot>),
    List {
        count: usize,
        snapshots: Vec<SnapshotSummary>,
    },
}
