// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The hash-chained Ledger.
//!
//! `append` is the only way blocks enter the chain. Appends and commits
//! serialize on one write lock; readers go straight to the backend.

use chrono::{SecondsFormat, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use strata_kernel::block::Block;
use strata_kernel::proof::ChainProof;
use strata_kernel::verify::{verify_chain, ChainReport, FailureKind};
use thiserror::Error;

use crate::storage::{StorageBackend, StorageError};

/// RFC 3339 UTC, microsecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("chain integrity failure at block {index}: {kind}")]
    Integrity { index: u64, kind: FailureKind },

    #[error("ledger write lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Proof that the caller holds the ledger write lock.
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

pub struct Ledger {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn genesis() -> Block {
        Block::genesis()
    }

    /// Take the write lock. Held across a whole commit.
    pub fn lock(&self) -> Result<WriteGuard<'_>> {
        let guard = self.write_lock.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(WriteGuard { _guard: guard })
    }

    pub fn append(&self, data: Vec<String>) -> Result<Block> {
        self.append_at(data, now_timestamp())
    }

    /// Append with a caller-supplied timestamp.
    pub fn append_at(&self, data: Vec<String>, timestamp: String) -> Result<Block> {
        let guard = self.lock()?;
        self.append_locked(&guard, data, timestamp)
    }

    /// Append while already holding the write lock.
    pub fn append_locked(
        &self,
        guard: &WriteGuard<'_>,
        data: Vec<String>,
        timestamp: String,
    ) -> Result<Block> {
        let start = Instant::now();
        let chain = self.load_or_init(guard)?;

        // load_or_init never returns an empty chain
        let tip = chain.last().cloned().unwrap_or_else(Block::genesis);
        if tip.index != chain.len() as u64 - 1 {
            return Err(LedgerError::Integrity {
                index: tip.index,
                kind: FailureKind::IndexMismatch,
            });
        }

        let block = tip.next(timestamp, data);
        self.backend.save_block(&block)?;

        metrics::counter!("strata_blocks_appended_total", 1);
        metrics::histogram!(
            "strata_block_append_duration_seconds",
            start.elapsed().as_secs_f64()
        );
        tracing::debug!(
            "Appended block {} ({} entries, hash {})",
            block.index,
            block.data.len(),
            &block.hash[..12]
        );
        Ok(block)
    }

    /// Current tip while holding the write lock. The next append lands at
    /// `tip.index + 1`.
    pub fn tip_locked(&self, guard: &WriteGuard<'_>) -> Result<Block> {
        let mut chain = self.load_or_init(guard)?;
        // load_or_init never returns an empty chain
        Ok(chain.pop().unwrap_or_else(Block::genesis))
    }

    /// Load the chain, writing genesis if nothing is stored yet.
    ///
    /// A load error is returned as is. An unreadable chain is never replaced
    /// by a fresh genesis.
    fn load_or_init(&self, _guard: &WriteGuard<'_>) -> Result<Vec<Block>> {
        match self.backend.load_blocks()? {
            Some(blocks) if !blocks.is_empty() => Ok(blocks),
            _ => {
                let genesis = Block::genesis();
                self.backend.save_block(&genesis)?;
                tracing::info!("Initialized ledger with genesis block {}", &genesis.hash[..12]);
                Ok(vec![genesis])
            }
        }
    }

    /// Full chain, genesis first.
    pub fn chain(&self) -> Result<Vec<Block>> {
        match self.backend.load_blocks()? {
            Some(blocks) if !blocks.is_empty() => Ok(blocks),
            _ => {
                let guard = self.lock()?;
                self.load_or_init(&guard)
            }
        }
    }

    pub fn latest_block(&self) -> Result<Block> {
        let mut chain = self.chain()?;
        // chain() is never empty
        Ok(chain.pop().unwrap_or_else(Block::genesis))
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.chain()?.len() as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Recompute every hash. Load failures count as invalid.
    pub fn is_valid(&self) -> bool {
        match self.verify() {
            Ok(report) => report.valid,
            Err(e) => {
                tracing::error!("Chain could not be loaded for validation: {}", e);
                false
            }
        }
    }

    /// Like `is_valid`, with the first failing block and reason.
    pub fn verify(&self) -> Result<ChainReport> {
        let blocks = self.backend.load_blocks()?.unwrap_or_default();
        let report = verify_chain(&blocks);
        if let Some(failure) = report.failure {
            tracing::warn!(
                "Chain verification failed at block {}: {}",
                failure.index,
                failure.kind
            );
        }
        Ok(report)
    }

    /// Most recent blocks first. With `type_filter`, only blocks holding a
    /// record of that `type`.
    pub fn history(&self, limit: usize, type_filter: Option<&str>) -> Result<Vec<Block>> {
        let chain = self.chain()?;
        Ok(chain
            .into_iter()
            .rev()
            .filter(|block| type_filter.map_or(true, |t| block.has_record_type(t)))
            .take(limit)
            .collect())
    }

    /// Proof receipt for the current chain. Refused for an invalid chain.
    pub fn proof(&self) -> Result<ChainProof> {
        let chain = self.chain()?;
        let (report, proof) = ChainProof::audit(&chain);
        match report.failure {
            Some(failure) => Err(LedgerError::Integrity {
                index: failure.index,
                kind: failure.kind,
            }),
            None => {
                metrics::counter!("strata_proofs_generated_total", 1);
                Ok(proof)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::BLOCKS_FILE;
    use crate::storage::{FileBackend, SqliteBackend};
    use serde_json::json;
    use tempfile::tempdir;

    fn file_ledger(dir: &std::path::Path) -> Ledger {
        Ledger::new(Arc::new(FileBackend::open(dir).unwrap()))
    }

    #[test]
    fn test_fresh_ledger_has_genesis() {
        let dir = tempdir().unwrap();
        let ledger = file_ledger(dir.path());

        let chain = ledger.chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0], Block::genesis());
        assert!(ledger.is_valid());
        assert!(dir.path().join(BLOCKS_FILE).exists());
    }

    #[test]
    fn test_append_links_blocks() {
        let dir = tempdir().unwrap();
        let ledger = file_ledger(dir.path());

        let b1 = ledger.append(vec!["a".to_string()]).unwrap();
        let b2 = ledger.append(vec!["b".to_string(), "c".to_string()]).unwrap();

        assert_eq!(ledger.len().unwrap(), 3);
        assert_eq!(b1.index, 1);
        assert_eq!(b2.previous_hash, b1.hash);
        assert_eq!(b1.previous_hash, Block::genesis().hash);
        assert!(ledger.is_valid());
        assert_eq!(ledger.latest_block().unwrap(), b2);
    }

    #[test]
    fn test_deterministic_append() {
        let a = tempdir().unwrap();
        let la = file_ledger(a.path());
        let lb = Ledger::new(Arc::new(SqliteBackend::in_memory().unwrap()));

        let ts = "2025-01-01T00:00:00Z".to_string();
        let x = la.append_at(vec!["x".to_string()], ts.clone()).unwrap();
        let y = lb.append_at(vec!["x".to_string()], ts).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_malformed_store_is_not_reset() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(BLOCKS_FILE), b"[{\"index\": 0,").unwrap();
        let ledger = file_ledger(dir.path());

        assert!(ledger.append(vec!["a".to_string()]).is_err());
        assert!(!ledger.is_valid());
        let raw = std::fs::read_to_string(dir.path().join(BLOCKS_FILE)).unwrap();
        assert_eq!(raw, "[{\"index\": 0,");
    }

    #[test]
    fn test_tampering_detected_and_proof_refused() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).unwrap());
        let ledger = Ledger::new(backend.clone());
        ledger.append(vec!["a".to_string()]).unwrap();
        ledger.append(vec!["b".to_string()]).unwrap();
        assert!(ledger.proof().is_ok());

        let mut blocks = backend.load_blocks().unwrap().unwrap();
        blocks[1].data[0] = "z".to_string();
        backend.save_all_blocks(&blocks).unwrap();

        let report = ledger.verify().unwrap();
        assert!(!report.valid);
        assert_eq!(report.failure.unwrap().index, 1);
        assert!(matches!(
            ledger.proof(),
            Err(LedgerError::Integrity { index: 1, .. })
        ));
    }

    #[test]
    fn test_history_newest_first_with_filter() {
        let dir = tempdir().unwrap();
        let ledger = file_ledger(dir.path());
        ledger
            .append(vec![json!({"type": "rule_transition"}).to_string()])
            .unwrap();
        ledger
            .append(vec![json!({"type": "knowledge_update"}).to_string()])
            .unwrap();
        ledger.append(vec!["plain".to_string()]).unwrap();

        let all = ledger.history(10, None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].index, 3);

        let rules = ledger.history(10, Some("rule_transition")).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].index, 1);

        assert_eq!(ledger.history(2, None).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_appends_stay_contiguous() {
        let dir = tempdir().unwrap();
        let ledger = Arc::new(file_ledger(dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        ledger.append(vec![format!("{}-{}", t, i)]).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.len().unwrap(), 21);
        assert!(ledger.is_valid());
    }
}
