//! Read-mostly view of a data directory.
//!
//! Unlike the node, opening a store here never writes a genesis block: an
//! absent chain is reported as such.

use anyhow::{Context, Result};
use std::sync::Arc;
use strata_kernel::block::Block;
use strata_node::config::NodeConfig;
use strata_node::layers::DirectoryLayerSource;
use strata_node::pending::PendingJournal;
use strata_node::snapshot::SnapshotManager;
use strata_node::storage::{open_backend, StorageBackend};

pub struct Store {
    pub config: NodeConfig,
    pub backend: Arc<dyn StorageBackend>,
    pub snapshots: SnapshotManager,
    pub pending: PendingJournal,
}

impl Store {
    pub fn open(config: NodeConfig) -> Result<Self> {
        let backend = open_backend(&config.storage).context("Failed to open storage backend")?;
        let source = Arc::new(DirectoryLayerSource::new(&config.layers_dir));
        let snapshots = SnapshotManager::new(config.snapshots_dir(), source)
            .context("Failed to open snapshot directory")?;
        let pending = PendingJournal::open(config.pending_path())
            .context("Failed to read pending changes")?;
        Ok(Self {
            config,
            backend,
            snapshots,
            pending,
        })
    }

    /// Stored blocks, empty when no chain was written yet.
    pub fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self
            .backend
            .load_blocks()
            .context("Failed to load blocks")?
            .unwrap_or_default())
    }
}

/// `2025-01-01T10:00:00.123456Z` -> `2025-01-01 10:00:00`
pub fn short_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

/// First 12 characters. Tampered files may hold non-ASCII hashes.
pub fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(12) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_hash("abc"), "abc");
        assert_eq!(short_hash("ééééééééééééé"), "éééééééééééé");
        assert_eq!(short_hash("0123456789aé€"), "0123456789aé");
    }
}
