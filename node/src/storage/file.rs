// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Flat-file storage.
//!
//! # Layout
//! ```text
//! <dir>/blocks.json       pretty-printed JSON array of blocks
//! <dir>/action_log.jsonl  one action entry per line
//! ```
//!
//! `blocks.json` is rewritten in full on every save, through a temp file and
//! a rename. There is no multi-file atomicity: a crash mid-write can still
//! leave a truncated `blocks.json`, which then fails to parse and is reported
//! as a load error. Callers treat that as fatal, never as "start fresh".

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use strata_kernel::block::Block;

use super::{ActionEntry, BackendKind, Result, StorageBackend, StorageError};

pub const BLOCKS_FILE: &str = "blocks.json";
pub const ACTION_LOG_FILE: &str = "action_log.jsonl";

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn blocks_path(&self) -> PathBuf {
        self.dir.join(BLOCKS_FILE)
    }

    pub fn action_log_path(&self) -> PathBuf {
        self.dir.join(ACTION_LOG_FILE)
    }

    fn write_blocks(&self, blocks: &[Block]) -> Result<()> {
        let path = self.blocks_path();
        let tmp_path = path.with_extension("json.tmp");

        {
            let mut file = File::create(&tmp_path)?;
            let json = serde_json::to_vec_pretty(blocks)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn try_record_action(&self, entry: &ActionEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.action_log_path())?;
        file.write_all(&line)?;
        Ok(())
    }

    fn try_action_history(&self, limit: usize) -> Result<Vec<ActionEntry>> {
        let path = self.action_log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActionEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping malformed action log line {}: {}", lineno + 1, e),
            }
        }

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

impl StorageBackend for FileBackend {
    fn load_blocks(&self) -> Result<Option<Vec<Block>>> {
        let path = self.blocks_path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(StorageError::Corrupt(format!("{} is empty", path.display())));
        }

        let blocks: Vec<Block> = serde_json::from_slice(&bytes)?;
        Ok(Some(blocks))
    }

    fn save_block(&self, block: &Block) -> Result<()> {
        let mut blocks = self.load_blocks()?.unwrap_or_default();
        let position = block.index as usize;

        if position < blocks.len() {
            blocks[position] = block.clone();
        } else if position == blocks.len() {
            blocks.push(block.clone());
        } else {
            return Err(StorageError::Corrupt(format!(
                "cannot save block {} after a chain of length {}",
                block.index,
                blocks.len()
            )));
        }

        self.write_blocks(&blocks)
    }

    fn save_all_blocks(&self, blocks: &[Block]) -> Result<()> {
        self.write_blocks(blocks)
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
        let path = self.action_log_path();
        if !path.exists() {
            return true;
        }
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to clear action log {:?}: {}", path, e);
                false
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.dir.is_dir()
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::File
    }
}
