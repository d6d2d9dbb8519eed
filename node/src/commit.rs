// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Commit Service - aggregating pending changes into snapshots
//!
//! A commit runs, under the ledger write lock:
//! 1. manifests built for every layer
//! 2. diff against the latest snapshot
//! 3. snapshot identity computed, anchored at `tip + 1`
//! 4. snapshot written to its temp file
//! 5. commit block appended
//! 6. snapshot renamed into place
//! 7. committed prefix of the pending journal dropped
//!
//! A failure before step 5 leaves the ledger untouched. If ANY step up to
//! and including 6 fails, pending changes stay.
//!
//! # States
//! clean -> dirty (register_change) -> committing -> clean

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use strata_kernel::change::PendingChange;
use strata_kernel::layer::Layer;
use strata_kernel::snapshot::{CommitType, DiffSummary, Snapshot};
use thiserror::Error;

use crate::config::AutoCommitConfig;
use crate::ledger::{now_timestamp, Ledger, LedgerError};
use crate::pending::{PendingCounts, PendingJournal};
use crate::snapshot::{SnapshotError, SnapshotManager};
use crate::storage::{ActionEntry, StorageError};

/// Record type of commit blocks.
pub const STATE_COMMIT_RECORD: &str = "state_commit";

/// Actor recorded on automatic commits.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("commit reason must not be empty")]
    MissingReason,

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Pending journal error: {0}")]
    Journal(#[from] StorageError),

    #[error("pending journal lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CommitError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub snapshot_hash: String,
    pub block_index: u64,
    pub commit_type: CommitType,
    pub summary: DiffSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCommit {
    pub snapshot_hash: String,
    pub created_at: String,
    pub commit_type: CommitType,
    pub created_by: String,
    pub reason: String,
    pub block_index: Option<u64>,
}

impl From<&Snapshot> for LastCommit {
    fn from(s: &Snapshot) -> Self {
        Self {
            snapshot_hash: s.snapshot_hash.clone(),
            created_at: s.created_at.clone(),
            commit_type: s.commit_type,
            created_by: s.created_by.clone(),
            reason: s.reason.clone(),
            block_index: s.block_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCommitStatus {
    pub enabled: bool,
    pub max_l1_changes: usize,
    pub max_total_changes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub last_commit: Option<LastCommit>,
    pub pending_changes: PendingCounts,
    pub thresholds_met: bool,
    pub auto_commit: AutoCommitStatus,
    pub snapshot_count: usize,
}

pub struct CommitService {
    ledger: Arc<Ledger>,
    snapshots: Arc<SnapshotManager>,
    pending: Mutex<PendingJournal>,
    auto_commit: AutoCommitConfig,
}

impl CommitService {
    pub fn new(
        ledger: Arc<Ledger>,
        snapshots: Arc<SnapshotManager>,
        pending: PendingJournal,
        auto_commit: AutoCommitConfig,
    ) -> Self {
        Self {
            ledger,
            snapshots,
            pending: Mutex::new(pending),
            auto_commit,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    fn journal(&self) -> Result<MutexGuard<'_, PendingJournal>> {
        self.pending.lock().map_err(|_| CommitError::Poisoned)
    }

    /// Track a mutation until the next commit. Returns the pending total.
    pub fn register_change(&self, change: PendingChange) -> Result<usize> {
        let mut journal = self.journal()?;
        tracing::debug!(
            "Pending {} {} {}",
            change.layer,
            change.action,
            change.entity_id
        );
        journal.push(change)?;
        metrics::gauge!("strata_pending_changes", journal.len() as f64);
        Ok(journal.len())
    }

    pub fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        Ok(self.journal()?.changes().to_vec())
    }

    pub fn pending_counts(&self) -> Result<PendingCounts> {
        Ok(self.journal()?.counts())
    }

    pub fn explicit_commit(&self, reason: &str, actor: &str, force: bool) -> Result<CommitOutcome> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CommitError::MissingReason);
        }
        self.commit(CommitType::Explicit, actor, reason, force)
    }

    /// Commit automatically when a threshold is crossed.
    ///
    /// Never fails: errors are logged and pending changes stay for the
    /// next attempt.
    pub fn check_and_auto_commit(&self) -> Option<CommitOutcome> {
        if !self.auto_commit.enabled {
            return None;
        }

        let counts = match self.pending_counts() {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!("Auto-commit check failed: {}", e);
                return None;
            }
        };
        let reason = self.threshold_breach(&counts)?;

        match self.commit(CommitType::Auto, SYSTEM_ACTOR, &reason, false) {
            Ok(outcome) => Some(outcome),
            // raced with another commit
            Err(CommitError::NothingToCommit) => None,
            Err(e) => {
                tracing::error!("Auto-commit failed, pending changes kept: {}", e);
                None
            }
        }
    }

    fn threshold_breach(&self, counts: &PendingCounts) -> Option<String> {
        let cfg = &self.auto_commit;
        let l1 = counts.layer(Layer::L1) as usize;
        let total = counts.total as usize;

        if cfg.max_l1_changes > 0 && l1 >= cfg.max_l1_changes {
            return Some(format!(
                "auto-commit: {} L1 changes >= threshold {}",
                l1, cfg.max_l1_changes
            ));
        }
        if cfg.max_total_changes > 0 && total >= cfg.max_total_changes {
            return Some(format!(
                "auto-commit: {} pending changes >= threshold {}",
                total, cfg.max_total_changes
            ));
        }
        None
    }

    fn commit(
        &self,
        commit_type: CommitType,
        actor: &str,
        reason: &str,
        force: bool,
    ) -> Result<CommitOutcome> {
        let start = Instant::now();
        let guard = self.ledger.lock()?;

        let changes = self.pending_changes()?;
        if changes.is_empty() && !force {
            return Err(CommitError::NothingToCommit);
        }

        let layers = self.snapshots.build_all()?;
        let previous = self.snapshots.latest()?;
        let diff = self
            .snapshots
            .diff(previous.as_ref().map(|s| &s.layers), &layers, &changes);

        let created_at = now_timestamp();
        let mut snapshot = Snapshot::new(
            created_at.clone(),
            commit_type,
            actor.to_string(),
            reason.to_string(),
            layers,
            changes,
            diff,
        );

        let tip = self.ledger.tip_locked(&guard)?;
        snapshot.block_index = Some(tip.index + 1);
        let staged = self.snapshots.stage(&snapshot)?;

        let record = json!({
            "type": STATE_COMMIT_RECORD,
            "commit_type": commit_type,
            "snapshot_hash": snapshot.snapshot_hash,
            "created_by": snapshot.created_by,
            "reason": snapshot.reason,
            "summary": snapshot.diff.summary,
            "timestamp": created_at,
        });
        let block = match self
            .ledger
            .append_locked(&guard, vec![record.to_string()], created_at)
        {
            Ok(block) => block,
            Err(e) => {
                staged.discard();
                return Err(e.into());
            }
        };

        if let Err(e) = staged.publish() {
            tracing::error!(
                "Commit block {} written but snapshot {} was not renamed into place: {}",
                block.index,
                snapshot.snapshot_hash,
                e
            );
            return Err(e.into());
        }

        let committed = snapshot.changes_since_last.len();
        {
            let mut journal = self.journal()?;
            journal.commit_prefix(committed)?;
            metrics::gauge!("strata_pending_changes", journal.len() as f64);
        }
        drop(guard);

        metrics::counter!("strata_commits_total", 1, "commit_type" => commit_type.as_str());
        metrics::histogram!("strata_commit_duration_seconds", start.elapsed().as_secs_f64());
        self.ledger.backend().record_action(
            &ActionEntry::new(STATE_COMMIT_RECORD).details(json!({
                "snapshot_hash": snapshot.snapshot_hash,
                "block_index": block.index,
                "commit_type": commit_type,
                "changes": committed,
            })),
        );
        tracing::info!(
            "{} commit {} at block {} ({} changes): {}",
            commit_type,
            &snapshot.snapshot_hash[..12],
            block.index,
            committed,
            reason
        );

        Ok(CommitOutcome {
            snapshot_hash: snapshot.snapshot_hash,
            block_index: block.index,
            commit_type,
            summary: snapshot.diff.summary,
        })
    }

    pub fn status(&self) -> Result<CommitStatus> {
        let counts = self.pending_counts()?;
        let last_commit = self.snapshots.latest()?.as_ref().map(LastCommit::from);
        Ok(CommitStatus {
            last_commit,
            thresholds_met: self.threshold_breach(&counts).is_some(),
            pending_changes: counts,
            auto_commit: AutoCommitStatus {
                enabled: self.auto_commit.enabled,
                max_l1_changes: self.auto_commit.max_l1_changes,
                max_total_changes: self.auto_commit.max_total_changes,
            },
            snapshot_count: self.snapshots.count()?,
        })
    }
}
