// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage Backends
//!
//! Persistence for the ledger and the operational action log. Three
//! interchangeable implementations:
//! - `FileBackend`: pretty-printed `blocks.json` + `action_log.jsonl`
//! - `SqliteBackend`: embedded SQL, WAL mode
//! - `PostgresBackend`: networked SQL, every row scoped by tenant
//!
//! # Failure policy
//! Block loading reports errors to the caller (the ledger decides whether
//! "nothing loaded" means genesis or a hard failure). Action-log operations
//! and readiness probes log and degrade to `false` / empty instead.
//!
//! # Concurrency
//! Backends do not serialize writers. The ledger write lock is the only
//! thing keeping `save_all_blocks` on the file backend single-writer.

pub mod file;
pub mod sqlite;
#[cfg(feature = "postgres")]
pub mod postgres;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use strata_kernel::block::Block;
use thiserror::Error;

use crate::config::StorageConfig;

pub use file::FileBackend;
pub use sqlite::SqliteBackend;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("Backend lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    File,
    Sqlite,
    Postgresql,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::File => "file",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgresql => "postgresql",
        })
    }
}

/// Free-form operational event. Not integrity protected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub timestamp: String,
    pub action: String,
    #[serde(default)]
    pub skill_id: Option<String>,
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub details: Value,
}

impl ActionEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            timestamp: crate::ledger::now_timestamp(),
            action: action.into(),
            skill_id: None,
            layer: None,
            details: Value::Null,
        }
    }

    pub fn skill(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_id = Some(skill_id.into());
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` means no chain has been written yet.
    fn load_blocks(&self) -> Result<Option<Vec<Block>>>;

    /// Insert or overwrite the block at `block.index`.
    fn save_block(&self, block: &Block) -> Result<()>;

    /// Replace the stored chain with `blocks`.
    fn save_all_blocks(&self, blocks: &[Block]) -> Result<()>;

    fn record_action(&self, entry: &ActionEntry) -> bool;

    /// Most recent `limit` entries, oldest first.
    fn action_history(&self, limit: usize) -> Vec<ActionEntry>;

    fn clear_action_log(&self) -> bool;

    fn is_ready(&self) -> bool;

    fn backend_type(&self) -> BackendKind;
}

/// Instantiate the backend selected by `cfg`.
pub fn open_backend(cfg: &StorageConfig) -> crate::errors::Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match cfg {
        StorageConfig::File { dir } => Arc::new(FileBackend::open(dir)?),
        StorageConfig::Sqlite { path } => Arc::new(SqliteBackend::open(path)?),
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres { url, tenant_id } => {
            Arc::new(PostgresBackend::connect(url, tenant_id)?)
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => {
            return Err(crate::errors::ConfigError::Unsupported("postgresql").into());
        }
    };
    tracing::info!("Storage backend ready: {}", backend.backend_type());
    Ok(backend)
}
