// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Embedded SQL storage (SQLite, WAL mode).
//!
//! ```text
//! blocks(block_index UNIQUE, timestamp, data JSON, previous_hash, merkle_root, hash)
//! action_logs(id, timestamp, action, skill_id, layer, details JSON)
//! ```

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use strata_kernel::block::Block;

use super::{ActionEntry, BackendKind, Result, StorageBackend, StorageError};

pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                block_index   INTEGER NOT NULL UNIQUE,
                timestamp     TEXT NOT NULL,
                data          TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                merkle_root   TEXT NOT NULL,
                hash          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS action_logs (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                action    TEXT NOT NULL,
                skill_id  TEXT,
                layer     TEXT,
                details   TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_action_logs_action ON action_logs(action);",
        )
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn upsert(conn: &Connection, block: &Block) -> Result<()> {
        let data = serde_json::to_string(&block.data)?;
        conn.execute(
            "INSERT INTO blocks (block_index, timestamp, data, previous_hash, merkle_root, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(block_index) DO UPDATE SET
                timestamp = excluded.timestamp,
                data = excluded.data,
                previous_hash = excluded.previous_hash,
                merkle_root = excluded.merkle_root,
                hash = excluded.hash",
            params![
                block.index as i64,
                block.timestamp,
                data,
                block.previous_hash,
                block.merkle_root,
                block.hash
            ],
        )?;
        Ok(())
    }

    fn try_record_action(&self, entry: &ActionEntry) -> Result<()> {
        let details = serde_json::to_string(&entry.details)?;
        self.lock()?.execute(
            "INSERT INTO action_logs (timestamp, action, skill_id, layer, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.timestamp, entry.action, entry.skill_id, entry.layer, details],
        )?;
        Ok(())
    }

    fn try_action_history(&self, limit: usize) -> Result<Vec<ActionEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, action, skill_id, layer, details FROM action_logs
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let details: Option<String> = row.get(4)?;
            Ok(ActionEntry {
                timestamp: row.get(0)?,
                action: row.get(1)?,
                skill_id: row.get(2)?,
                layer: row.get(3)?,
                details: details
                    .and_then(|d| serde_json::from_str(&d).ok())
                    .unwrap_or(serde_json::Value::Null),
            })
        })?;

        let mut entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        entries.reverse();
        Ok(entries)
    }
}

impl StorageBackend for SqliteBackend {
    fn load_blocks(&self) -> Result<Option<Vec<Block>>> {
        let conn = self.lock()?;

        let count: Option<i64> = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .optional()?;
        if count.unwrap_or(0) == 0 {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT block_index, timestamp, data, previous_hash, merkle_root, hash
             FROM blocks ORDER BY block_index ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            let (index, timestamp, data, previous_hash, merkle_root, hash) = row?;
            blocks.push(Block {
                index: index as u64,
                timestamp,
                data: serde_json::from_str(&data)?,
                previous_hash,
                merkle_root,
                hash,
            });
        }
        Ok(Some(blocks))
    }

    fn save_block(&self, block: &Block) -> Result<()> {
        let conn = self.lock()?;
        Self::upsert(&conn, block)
    }

    fn save_all_blocks(&self, blocks: &[Block]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM blocks", [])?;
        for block in blocks {
            Self::upsert(&tx, block)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn record_action(&self, entry: &ActionEntry) -> bool {
        match self.try_record_action(entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to record action '{}': {}", entry.action, e);
                false
            }
        }
    }

    fn action_history(&self, limit: usize) -> Vec<ActionEntry> {
        self.try_action_history(limit).unwrap_or_else(|e| {
            tracing::error!("Failed to read action log: {}", e);
            Vec::new()
        })
    }

    fn clear_action_log(&self) -> bool {
        let result = self
            .lock()
            .and_then(|conn| conn.execute("DELETE FROM action_logs", []).map_err(StorageError::from));
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to clear action log: {}", e);
                false
            }
        }
    }

    fn is_ready(&self) -> bool {
        match self.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok(),
            Err(_) => false,
        }
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn chain() -> Vec<Block> {
        let genesis = Block::genesis();
        let b1 = genesis.next("t1".to_string(), vec!["a".to_string()]);
        let b2 = b1.next("t2".to_string(), vec!["b".to_string(), "c".to_string()]);
        vec![genesis, b1, b2]
    }

    #[test]
    fn test_empty_table_means_no_chain() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.load_blocks().unwrap().is_none());
        assert!(backend.is_ready());
        assert_eq!(backend.backend_type(), BackendKind::Sqlite);
    }

    #[test]
    fn test_blocks_roundtrip_in_order() {
        let backend = SqliteBackend::in_memory().unwrap();
        let blocks = chain();
        // Insert out of order, read back ordered by index.
        backend.save_block(&blocks[0]).unwrap();
        backend.save_block(&blocks[2]).unwrap();
        backend.save_block(&blocks[1]).unwrap();
        assert_eq!(backend.load_blocks().unwrap().unwrap(), blocks);
    }

    #[test]
    fn test_save_all_replaces_chain() {
        let backend = SqliteBackend::in_memory().unwrap();
        let blocks = chain();
        backend.save_all_blocks(&blocks).unwrap();
        backend.save_all_blocks(&blocks[..2]).unwrap();
        assert_eq!(backend.load_blocks().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("strata.db");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.save_all_blocks(&chain()).unwrap();
        }
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.load_blocks().unwrap().unwrap(), chain());
    }

    #[test]
    fn test_action_log() {
        let backend = SqliteBackend::in_memory().unwrap();
        for i in 0..3 {
            backend.record_action(&ActionEntry::new(format!("a{}", i)).details(json!({ "i": i })));
        }
        let history = backend.action_history(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, "a1");
        assert_eq!(history[1].details, json!({ "i": 2 }));

        assert!(backend.clear_action_log());
        assert!(backend.action_history(5).is_empty());
    }
}
