// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot Manager
//!
//! Builds per-layer manifests from a `LayerSource`, diffs them against the
//! previous snapshot and stores snapshots as
//! `<snapshots_dir>/<snapshot_hash>.json`. Snapshots are never deleted.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_kernel::change::PendingChange;
use strata_kernel::layer::Layer;
use strata_kernel::manifest::{EntityDigest, LayerManifest, LayerManifests};
use strata_kernel::snapshot::{Snapshot, SnapshotDiff};
use thiserror::Error;

use crate::layers::{LayerError, LayerSource};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot '{0}' not found")]
    NotFound(String),

    #[error("snapshot prefix '{prefix}' is ambiguous ({matches} matches)")]
    Ambiguous { prefix: String, matches: usize },

    #[error("invalid snapshot hash '{0}'")]
    InvalidHash(String),

    #[error("layer source error: {0}")]
    Layer(#[from] LayerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// A snapshot written to `<hash>.json.tmp` and not yet listed.
#[must_use]
#[derive(Debug)]
pub struct StagedSnapshot {
    hash: String,
    tmp_path: PathBuf,
    path: PathBuf,
}

impl StagedSnapshot {
    /// Rename into place.
    pub fn publish(self) -> Result<PathBuf> {
        fs::rename(&self.tmp_path, &self.path)?;
        tracing::info!("Snapshot {} saved to {:?}", &self.hash[..12.min(self.hash.len())], self.path);
        Ok(self.path)
    }

    /// Drop the temp file.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.tmp_path) {
            tracing::warn!("Failed to remove staged snapshot {:?}: {}", self.tmp_path, e);
        }
    }
}

pub struct SnapshotManager {
    dir: PathBuf,
    source: Arc<dyn LayerSource>,
}

impl SnapshotManager {
    pub fn new(dir: impl AsRef<Path>, source: Arc<dyn LayerSource>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, source })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source(&self) -> &Arc<dyn LayerSource> {
        &self.source
    }

    pub fn build_manifest(&self, layer: Layer) -> Result<LayerManifest> {
        let digests = self
            .source
            .entities(layer)?
            .into_iter()
            .map(|entity| EntityDigest::of(entity.id, &entity.content))
            .collect();
        Ok(LayerManifest::from_digests(digests))
    }

    pub fn build_all(&self) -> Result<LayerManifests> {
        Ok(LayerManifests {
            l0: self.build_manifest(Layer::L0)?,
            l1: self.build_manifest(Layer::L1)?,
            l2: self.build_manifest(Layer::L2)?,
        })
    }

    /// `previous = None` treats every entity as added.
    pub fn diff(
        &self,
        previous: Option<&LayerManifests>,
        current: &LayerManifests,
        changes: &[PendingChange],
    ) -> SnapshotDiff {
        SnapshotDiff::between(previous, current, changes)
    }

    fn snapshot_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }

    pub fn persist(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        self.stage(snapshot)?.publish()
    }

    /// Write `snapshot` to its temp file. Readers do not see it until
    /// `StagedSnapshot::publish`.
    pub fn stage(&self, snapshot: &Snapshot) -> Result<StagedSnapshot> {
        if !is_hex(&snapshot.snapshot_hash) {
            return Err(SnapshotError::InvalidHash(snapshot.snapshot_hash.clone()));
        }

        let path = self.snapshot_path(&snapshot.snapshot_hash);
        let tmp_path = path.with_extension("json.tmp");
        let written = serde_json::to_vec_pretty(snapshot)
            .map_err(SnapshotError::from)
            .and_then(|bytes| {
                let mut file = File::create(&tmp_path)?;
                file.write_all(&bytes)?;
                file.sync_all()?;
                Ok(())
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        Ok(StagedSnapshot {
            hash: snapshot.snapshot_hash.clone(),
            tmp_path,
            path,
        })
    }

    /// Hashes of every stored snapshot, unordered.
    fn stored_hashes(&self) -> Result<Vec<String>> {
        let mut hashes = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_hex(stem) {
                    hashes.push(stem.to_string());
                }
            }
        }
        Ok(hashes)
    }

    fn read(&self, hash: &str) -> Result<Snapshot> {
        let bytes = fs::read(self.snapshot_path(hash))?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if !snapshot.is_consistent() {
            tracing::warn!("Snapshot {} does not match its recorded hash", hash);
        }
        Ok(snapshot)
    }

    /// Load by full hash or unique prefix.
    pub fn load_snapshot(&self, prefix: &str) -> Result<Snapshot> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if !is_hex(&prefix) {
            return Err(SnapshotError::InvalidHash(prefix));
        }

        let matches: Vec<String> = self
            .stored_hashes()?
            .into_iter()
            .filter(|hash| hash.starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(SnapshotError::NotFound(prefix)),
            [hash] => self.read(hash),
            _ => Err(SnapshotError::Ambiguous {
                prefix,
                matches: matches.len(),
            }),
        }
    }

    /// Newest first.
    pub fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for hash in self.stored_hashes()? {
            match self.read(&hash) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!("Skipping unreadable snapshot {}: {}", hash, e),
            }
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.block_index.cmp(&a.block_index))
        });
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    pub fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self.list_snapshots(1)?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.stored_hashes()?.len())
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::MemoryLayerSource;
    use strata_kernel::snapshot::CommitType;
    use tempfile::tempdir;

    fn manager(dir: &Path) -> (SnapshotManager, Arc<MemoryLayerSource>) {
        let source = Arc::new(MemoryLayerSource::new());
        let manager = SnapshotManager::new(dir.join("snapshots"), source.clone()).unwrap();
        (manager, source)
    }

    fn snapshot_at(manager: &SnapshotManager, created_at: &str, reason: &str) -> Snapshot {
        let layers = manager.build_all().unwrap();
        let diff = manager.diff(None, &layers, &[]);
        Snapshot::new(
            created_at.to_string(),
            CommitType::Explicit,
            "tester".to_string(),
            reason.to_string(),
            layers,
            Vec::new(),
            diff,
        )
    }

    #[test]
    fn test_manifest_tracks_layer_contents() {
        let dir = tempdir().unwrap();
        let (manager, source) = manager(dir.path());
        let empty = manager.build_all().unwrap();

        source.put(Layer::L1, "fact", "v1").unwrap();
        let one = manager.build_all().unwrap();
        assert_eq!(one.l0, empty.l0);
        assert_ne!(one.l1.manifest_hash, empty.l1.manifest_hash);
        assert_eq!(one.l1.entity_count, 1);

        let diff = manager.diff(Some(&empty), &one, &[]);
        assert_eq!(diff.l1.added, vec!["fact".to_string()]);
        assert_eq!(diff.summary.l1_added, 1);
    }

    #[test]
    fn test_persist_and_load_by_prefix() {
        let dir = tempdir().unwrap();
        let (manager, _) = manager(dir.path());
        let snapshot = snapshot_at(&manager, "2025-01-01T00:00:00Z", "first");
        manager.persist(&snapshot).unwrap();

        let loaded = manager.load_snapshot(&snapshot.snapshot_hash[..8]).unwrap();
        assert_eq!(loaded, snapshot);

        let mut other = snapshot.snapshot_hash.clone();
        let last = if other.ends_with('0') { "1" } else { "0" };
        other.replace_range(63.., last);
        assert!(matches!(
            manager.load_snapshot(&other),
            Err(SnapshotError::NotFound(_))
        ));
        assert!(matches!(
            manager.load_snapshot("not-hex"),
            Err(SnapshotError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_ambiguous_prefix() {
        let dir = tempdir().unwrap();
        let (manager, _) = manager(dir.path());
        // 17 hashes over 16 hex digits: some leading digit repeats
        let mut hashes = Vec::new();
        for i in 0..17 {
            let snapshot = snapshot_at(&manager, "2025-01-01T00:00:00Z", &format!("r{}", i));
            manager.persist(&snapshot).unwrap();
            hashes.push(snapshot.snapshot_hash);
        }

        let shared = hashes
            .iter()
            .map(|h| &h[..1])
            .find(|p| hashes.iter().filter(|h| h.starts_with(*p)).count() > 1)
            .unwrap();
        assert!(matches!(
            manager.load_snapshot(shared),
            Err(SnapshotError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempdir().unwrap();
        let (manager, _) = manager(dir.path());
        for (ts, reason) in [
            ("2025-01-01T00:00:00Z", "a"),
            ("2025-03-01T00:00:00Z", "c"),
            ("2025-02-01T00:00:00Z", "b"),
        ] {
            manager.persist(&snapshot_at(&manager, ts, reason)).unwrap();
        }

        let listed = manager.list_snapshots(10).unwrap();
        let reasons: Vec<&str> = listed.iter().map(|s| s.reason.as_str()).collect();
        assert_eq!(reasons, vec!["c", "b", "a"]);
        assert_eq!(manager.list_snapshots(1).unwrap().len(), 1);
        assert_eq!(manager.latest().unwrap().unwrap().reason, "c");
        assert_eq!(manager.count().unwrap(), 3);
    }
}
