// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use strata_kernel::governance::{GovernancePolicy, StaticPolicy};

use crate::commit::CommitService;
use crate::config::NodeConfig;
use crate::errors::Result;
use crate::layers::{DirectoryLayerSource, LayerSource};
use crate::ledger::Ledger;
use crate::pending::PendingJournal;
use crate::recorder::{MutationRecorder, MutationSession};
use crate::snapshot::SnapshotManager;
use crate::storage::{open_backend, StorageBackend};

/// One governed store: ledger, snapshots, pending changes and the
/// recorder that ties them together.
pub struct Strata {
    config: NodeConfig,
    ledger: Arc<Ledger>,
    source: Arc<dyn LayerSource>,
    snapshots: Arc<SnapshotManager>,
    commits: Arc<CommitService>,
    recorder: MutationRecorder,
}

impl Strata {
    /// Open the backend and layer directory named by `cfg`.
    pub fn open(cfg: NodeConfig) -> Result<Self> {
        let backend = open_backend(&cfg.storage)?;
        let source: Arc<dyn LayerSource> = Arc::new(DirectoryLayerSource::new(&cfg.layers_dir));
        Self::with_parts(cfg, backend, source)
    }

    /// Assemble from an already opened backend and layer source.
    pub fn with_parts(
        cfg: NodeConfig,
        backend: Arc<dyn StorageBackend>,
        source: Arc<dyn LayerSource>,
    ) -> Result<Self> {
        let ledger = Arc::new(Ledger::new(backend));

        // Writes genesis on first start. An unreadable chain stops startup.
        let length = ledger.len()?;
        let report = ledger.verify()?;
        if report.valid {
            tracing::info!("Ledger loaded: {} blocks, chain valid", length);
        } else {
            tracing::error!("Ledger loaded: {} blocks, chain INVALID: {:?}", length, report.failure);
        }

        let snapshots = Arc::new(SnapshotManager::new(cfg.snapshots_dir(), source.clone())?);
        let pending = PendingJournal::open(cfg.pending_path())?;
        let commits = Arc::new(CommitService::new(
            ledger.clone(),
            snapshots.clone(),
            pending,
            cfg.auto_commit,
        ));
        let recorder = MutationRecorder::new(
            commits.clone(),
            source.clone(),
            StaticPolicy::with_table(cfg.governance),
        );

        Ok(Self {
            config: cfg,
            ledger,
            source,
            snapshots,
            commits,
            recorder,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn source(&self) -> &Arc<dyn LayerSource> {
        &self.source
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    pub fn commits(&self) -> &Arc<CommitService> {
        &self.commits
    }

    pub fn recorder(&self) -> &MutationRecorder {
        &self.recorder
    }

    pub fn policy(&self) -> Arc<dyn GovernancePolicy> {
        self.recorder.policy()
    }

    /// A session with the configured mutation budget.
    pub fn new_session(&self) -> MutationSession {
        MutationSession::new(self.config.max_mutations_per_session)
    }
}
