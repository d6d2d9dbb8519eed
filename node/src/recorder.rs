// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Mutation recording.
//!
//! The one path by which a collaborator reports a change to a layer:
//! 1. session budget check
//! 2. policy resolved (self-describing or static)
//! 3. immutable layer and L0 allow-list checks
//! 4. ledger record by recording mode (`full`, `hash_only`, nothing)
//! 5. pending change registered
//! 6. optional auto-commit check
//!
//! Policy rejections happen before anything is written.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use strata_kernel::change::{ChangeAction, PendingChange};
use strata_kernel::governance::{GovernancePolicy, StaticPolicy};
use strata_kernel::hash::content_hash;
use strata_kernel::layer::{Layer, RecordingMode};
use thiserror::Error;

use crate::commit::{CommitOutcome, CommitService};
use crate::errors::Result;
use crate::governance::resolve_policy;
use crate::layers::LayerSource;
use crate::ledger::now_timestamp;
use crate::storage::ActionEntry;

pub const RULE_TRANSITION_RECORD: &str = "rule_transition";
pub const KNOWLEDGE_UPDATE_RECORD: &str = "knowledge_update";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("layer {0} is immutable")]
    ImmutableLayer(Layer),

    #[error("entity '{0}' is not on the L0 allow-list")]
    NotAllowedInL0(String),

    #[error("session mutation budget of {max} exhausted")]
    SessionBudgetExceeded { max: u32 },
}

/// Mutation budget for one run of changes. `max_mutations == 0` is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSession {
    max_mutations: u32,
    count: u32,
}

impl MutationSession {
    pub fn new(max_mutations: u32) -> Self {
        Self {
            max_mutations,
            count: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max_mutations(&self) -> u32 {
        self.max_mutations
    }

    pub fn remaining(&self) -> Option<u32> {
        (self.max_mutations > 0).then(|| self.max_mutations.saturating_sub(self.count))
    }

    pub fn check(&self) -> std::result::Result<(), PolicyError> {
        if self.max_mutations > 0 && self.count >= self.max_mutations {
            return Err(PolicyError::SessionBudgetExceeded {
                max: self.max_mutations,
            });
        }
        Ok(())
    }

    fn consume(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// A change to one entity, with its content before and after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub layer: Layer,
    pub action: ChangeAction,
    pub entity_id: String,
    pub reason: String,
    #[serde(default)]
    pub prev_content: Option<String>,
    #[serde(default)]
    pub next_content: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Mutation {
    pub fn new(
        layer: Layer,
        action: ChangeAction,
        entity_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            action,
            entity_id: entity_id.into(),
            reason: reason.into(),
            prev_content: None,
            next_content: None,
            metadata: Map::new(),
        }
    }

    pub fn before(mut self, content: impl Into<String>) -> Self {
        self.prev_content = Some(content.into());
        self
    }

    pub fn after(mut self, content: impl Into<String>) -> Self {
        self.next_content = Some(content.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn prev_hash(&self) -> Option<String> {
        self.prev_content.as_ref().map(|c| content_hash(c.as_bytes()))
    }

    fn next_hash(&self) -> Option<String> {
        self.next_content.as_ref().map(|c| content_hash(c.as_bytes()))
    }

    fn ledger_record(&self, mode: RecordingMode, timestamp: &str) -> Option<Value> {
        let mut record = json!({
            "layer": self.layer,
            "entity_id": self.entity_id,
            "action": self.action,
            "reason": self.reason,
            "prev_hash": self.prev_hash(),
            "next_hash": self.next_hash(),
            "timestamp": timestamp,
        });
        match mode {
            RecordingMode::Full => {
                record["type"] = json!(RULE_TRANSITION_RECORD);
                record["prev_content"] = json!(self.prev_content);
                record["next_content"] = json!(self.next_content);
            }
            RecordingMode::HashOnly => {
                record["type"] = json!(KNOWLEDGE_UPDATE_RECORD);
            }
            RecordingMode::None => return None,
        }
        Some(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub recording_mode: RecordingMode,
    pub block_index: Option<u64>,
    pub pending_total: usize,
    pub auto_commit: Option<CommitOutcome>,
}

pub struct MutationRecorder {
    commits: Arc<CommitService>,
    source: Arc<dyn LayerSource>,
    base_policy: StaticPolicy,
    auto_commit: bool,
}

impl MutationRecorder {
    pub fn new(
        commits: Arc<CommitService>,
        source: Arc<dyn LayerSource>,
        base_policy: StaticPolicy,
    ) -> Self {
        Self {
            commits,
            source,
            base_policy,
            auto_commit: true,
        }
    }

    /// Skip the auto-commit check after each record.
    pub fn without_auto_commit(mut self) -> Self {
        self.auto_commit = false;
        self
    }

    /// The policy in force right now.
    pub fn policy(&self) -> Arc<dyn GovernancePolicy> {
        resolve_policy(self.source.as_ref(), &self.base_policy)
    }

    pub fn record(&self, session: &mut MutationSession, mutation: Mutation) -> Result<RecordOutcome> {
        session.check()?;

        let policy = self.policy();
        let layer_policy = policy.policy_for(mutation.layer);
        if !layer_policy.mutable {
            return Err(PolicyError::ImmutableLayer(mutation.layer).into());
        }
        if mutation.layer == Layer::L0 && !policy.is_allowed_in_l0(&mutation.entity_id) {
            tracing::warn!("Rejected L0 mutation of '{}'", mutation.entity_id);
            return Err(PolicyError::NotAllowedInL0(mutation.entity_id).into());
        }

        let mode = layer_policy.blockchain_mode;
        let timestamp = now_timestamp();
        let block_index = match mutation.ledger_record(mode, &timestamp) {
            Some(record) => {
                let block = self
                    .commits
                    .ledger()
                    .append_at(vec![record.to_string()], timestamp.clone())?;
                Some(block.index)
            }
            None => None,
        };

        let mut change = PendingChange::new(
            mutation.layer,
            mutation.action,
            mutation.entity_id.clone(),
            mutation.reason.clone(),
            timestamp,
        );
        change.metadata = mutation.metadata.clone();
        if let Some(index) = block_index {
            change = change.with_metadata("block_index", json!(index));
        }
        let pending_total = self.commits.register_change(change)?;
        session.consume();

        self.commits.ledger().backend().record_action(
            &ActionEntry::new("mutation_recorded")
                .skill(mutation.entity_id.clone())
                .layer(mutation.layer.as_str())
                .details(json!({
                    "action": mutation.action,
                    "recording_mode": mode,
                    "block_index": block_index,
                })),
        );
        tracing::debug!(
            "Recorded {} {} {} ({})",
            mutation.layer,
            mutation.action,
            mutation.entity_id,
            mode
        );

        let auto_commit = if self.auto_commit {
            self.commits.check_and_auto_commit()
        } else {
            None
        };

        Ok(RecordOutcome {
            recording_mode: mode,
            block_index,
            pending_total,
            auto_commit,
        })
    }
}
