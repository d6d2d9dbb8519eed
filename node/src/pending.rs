// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pending Change Journal
//!
//! Mutations registered since the last successful commit.
//!
//! # Semantics
//! - changes are appended in registration order
//! - a commit works on a prefix of the journal and drops exactly that
//!   prefix once the commit block is durable
//! - changes registered while a commit runs survive it
//!
//! With a path configured the journal is mirrored to a JSON array after
//! every change, so pending work survives a restart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use strata_kernel::change::{ChangeAction, PendingChange};
use strata_kernel::layer::Layer;

use crate::storage::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    pub total: u64,
    pub by_layer: BTreeMap<String, u64>,
    pub by_action: BTreeMap<String, u64>,
}

impl PendingCounts {
    pub fn of(changes: &[PendingChange]) -> Self {
        let mut by_layer: BTreeMap<String, u64> =
            Layer::ALL.iter().map(|l| (l.as_str().to_string(), 0)).collect();
        let mut by_action: BTreeMap<String, u64> = ChangeAction::ALL
            .iter()
            .map(|a| (a.as_str().to_string(), 0))
            .collect();

        for change in changes {
            *by_layer.entry(change.layer.as_str().to_string()).or_default() += 1;
            *by_action.entry(change.action.as_str().to_string()).or_default() += 1;
        }

        Self {
            total: changes.len() as u64,
            by_layer,
            by_action,
        }
    }

    pub fn layer(&self, layer: Layer) -> u64 {
        self.by_layer.get(layer.as_str()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct PendingJournal {
    path: Option<PathBuf>,
    changes: Vec<PendingChange>,
}

impl PendingJournal {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the journal at `path`, restoring any changes left by a previous run.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let changes = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                Vec::new()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            Vec::new()
        };

        if !changes.is_empty() {
            tracing::info!("Restored {} pending changes from {:?}", changes.len(), path);
        }
        Ok(Self {
            path: Some(path),
            changes,
        })
    }

    pub fn push(&mut self, change: PendingChange) -> Result<()> {
        self.changes.push(change);
        if let Err(e) = self.persist() {
            self.changes.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn counts(&self) -> PendingCounts {
        PendingCounts::of(&self.changes)
    }

    /// Drop the first `count` changes after they were committed.
    pub fn commit_prefix(&mut self, count: usize) -> Result<()> {
        let count = count.min(self.changes.len());
        let mut committed: Vec<PendingChange> = self.changes.drain(..count).collect();
        if let Err(e) = self.persist() {
            // keep memory and disk in agreement
            committed.append(&mut self.changes);
            self.changes = committed;
            return Err(e);
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.commit_prefix(self.changes.len())
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serde_json::to_vec_pretty(&self.changes)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn change(layer: Layer, action: ChangeAction, id: &str) -> PendingChange {
        PendingChange::new(layer, action, id, "test", "2025-01-01T00:00:00Z")
    }

    #[test]
    fn test_counts_include_every_layer_and_action() {
        let mut journal = PendingJournal::in_memory();
        journal.push(change(Layer::L1, ChangeAction::Create, "a")).unwrap();
        journal.push(change(Layer::L1, ChangeAction::Update, "b")).unwrap();
        journal.push(change(Layer::L2, ChangeAction::Create, "c")).unwrap();

        let counts = journal.counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.layer(Layer::L0), 0);
        assert_eq!(counts.layer(Layer::L1), 2);
        assert_eq!(counts.by_action["create"], 2);
        assert_eq!(counts.by_action["promote"], 0);
    }

    #[test]
    fn test_commit_prefix_keeps_later_changes() {
        let mut journal = PendingJournal::in_memory();
        journal.push(change(Layer::L1, ChangeAction::Create, "a")).unwrap();
        journal.push(change(Layer::L1, ChangeAction::Create, "b")).unwrap();
        journal.push(change(Layer::L1, ChangeAction::Create, "c")).unwrap();

        journal.commit_prefix(2).unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.changes()[0].entity_id, "c");

        journal.clear().unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn test_persisted_journal_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pending_changes.json");
        {
            let mut journal = PendingJournal::open(&path).unwrap();
            journal.push(change(Layer::L0, ChangeAction::Update, "core_safety")).unwrap();
        }

        let mut journal = PendingJournal::open(&path).unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.changes()[0].layer, Layer::L0);

        journal.clear().unwrap();
        assert!(PendingJournal::open(&path).unwrap().is_empty());
    }
}
