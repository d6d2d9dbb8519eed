// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain and state operations exposed to collaborators.
//!
//! Each operation is synchronous and may block on storage. The HTTP layer
//! runs them on the blocking pool.

use strata_kernel::proof::ChainProof;

use crate::api::*;
use crate::commit::{CommitOutcome, CommitStatus};
use crate::engine::Strata;
use crate::errors::{Result, StrataError};
use crate::storage::ActionEntry;

/// Actor recorded when a commit request names none.
pub const DEFAULT_ACTOR: &str = "agent";

pub fn chain_status(strata: &Strata) -> Result<ChainStatusResponse> {
    let ledger = strata.ledger();
    let latest_block = ledger.latest_block()?;
    Ok(ChainStatusResponse {
        valid: ledger.is_valid(),
        length: ledger.len()?,
        latest_block,
    })
}

pub fn chain_verify(strata: &Strata) -> Result<ChainVerifyResponse> {
    let report = strata.ledger().verify()?;
    Ok(ChainVerifyResponse {
        valid: report.valid,
        length: report.length,
        failure: report.failure,
    })
}

pub fn chain_history(
    strata: &Strata,
    limit: usize,
    type_filter: Option<&str>,
) -> Result<ChainHistoryResponse> {
    let blocks = strata.ledger().history(limit, type_filter)?;
    Ok(ChainHistoryResponse {
        count: blocks.len(),
        blocks,
    })
}

/// Append a raw block of log entries.
pub fn chain_record(strata: &Strata, logs: Vec<String>) -> Result<ChainRecordResponse> {
    if logs.is_empty() {
        return Err(StrataError::InvalidInput("logs must not be empty".to_string()));
    }
    let block = strata.ledger().append(logs)?;
    strata.ledger().backend().record_action(
        &ActionEntry::new("chain_record")
            .details(serde_json::json!({ "block_index": block.index })),
    );
    Ok(ChainRecordResponse { block })
}

pub fn chain_proof(strata: &Strata) -> Result<ChainProof> {
    Ok(strata.ledger().proof()?)
}

pub fn state_commit(
    strata: &Strata,
    reason: &str,
    force: bool,
    actor: Option<&str>,
) -> Result<CommitOutcome> {
    let actor = actor.filter(|a| !a.trim().is_empty()).unwrap_or(DEFAULT_ACTOR);
    Ok(strata.commits().explicit_commit(reason, actor, force)?)
}

pub fn state_status(strata: &Strata) -> Result<CommitStatus> {
    Ok(strata.commits().status()?)
}

/// A single snapshot when `hash` is given, the newest `limit` otherwise.
pub fn state_history(
    strata: &Strata,
    limit: usize,
    hash: Option<&str>,
) -> Result<StateHistoryResponse> {
    if let Some(hash) = hash {
        let snapshot = strata.snapshots().load_snapshot(hash)?;
        return Ok(StateHistoryResponse::Snapshot(Box::new(snapshot)));
    }

    let snapshots: Vec<SnapshotSummary> = strata
        .snapshots()
        .list_snapshots(limit)?
        .iter()
        .map(SnapshotSummary::from)
        .collect();
    Ok(StateHistoryResponse::List {
        count: snapshots.len(),
        snapshots,
    })
}
