// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strata_kernel::governance::LayerTable;
use strata_kernel::layer::{Layer, LayerPolicy, RecordingMode};

use crate::errors::ConfigError;

#[derive(Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// `blocks.json` + `action_log.jsonl` under `dir`.
    File { dir: PathBuf },
    Sqlite { path: PathBuf },
    /// Every row is scoped by `tenant_id`.
    Postgres { url: String, tenant_id: String },
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::File { .. } => "file",
            StorageConfig::Sqlite { .. } => "sqlite",
            StorageConfig::Postgres { .. } => "postgresql",
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
            StorageConfig::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            StorageConfig::Postgres { url, tenant_id } => f
                .debug_struct("Postgres")
                .field("url", &redact_url(url))
                .field("tenant_id", tenant_id)
                .finish(),
        }
    }
}

/// `postgres://user:pw@host/db` -> `postgres://***@host/db`
fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some(parts) => parts,
        None => return "***".to_string(),
    };
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCommitConfig {
    pub enabled: bool,
    /// Commit once this many L1 changes are pending. 0 disables the check.
    pub max_l1_changes: usize,
    /// Commit once this many changes of any layer are pending. 0 disables the check.
    pub max_total_changes: usize,
}

impl Default for AutoCommitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_l1_changes: 5,
            max_total_changes: 20,
        }
    }
}

#[derive(Clone)]
pub struct NodeConfig {
    /// Root for snapshots, pending changes and file storage.
    pub data_dir: PathBuf,
    /// Root of the `l0/`, `l1/`, `l2/` layer directories.
    pub layers_dir: PathBuf,
    pub storage: StorageConfig,
    pub auto_commit: AutoCommitConfig,
    pub governance: LayerTable,
    /// Mutations allowed per session. 0 means unlimited.
    pub max_mutations_per_session: u32,
    pub bind_addr: SocketAddr,
    pub auth_token: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("strata_data");
        Self {
            layers_dir: data_dir.join("layers"),
            storage: StorageConfig::File { dir: data_dir.join("chain") },
            data_dir,
            auto_commit: AutoCommitConfig::default(),
            governance: LayerTable::default(),
            max_mutations_per_session: 10,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            auth_token: None,
        }
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("data_dir", &self.data_dir)
            .field("layers_dir", &self.layers_dir)
            .field("storage", &self.storage)
            .field("auto_commit", &self.auto_commit)
            .field("governance", &self.governance)
            .field("max_mutations_per_session", &self.max_mutations_per_session)
            .field("bind_addr", &self.bind_addr)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl NodeConfig {
    /// Config rooted at `dir`, file storage, defaults elsewhere.
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            layers_dir: dir.join("layers"),
            storage: StorageConfig::File { dir: dir.join("chain") },
            data_dir: dir,
            ..Self::default()
        }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join("pending_changes.json")
    }

    /// Read `STRATA_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("STRATA_DATA_DIR") {
            Some(dir) => Self::with_data_dir(dir),
            None => Self::default(),
        };

        if let Some(dir) = lookup("STRATA_LAYERS_DIR") {
            cfg.layers_dir = PathBuf::from(dir);
        }

        cfg.storage = match lookup("STRATA_STORAGE_BACKEND").as_deref() {
            None | Some("file") => StorageConfig::File {
                dir: lookup("STRATA_CHAIN_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| cfg.data_dir.join("chain")),
            },
            Some("sqlite") => StorageConfig::Sqlite {
                path: lookup("STRATA_SQLITE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| cfg.data_dir.join("strata.db")),
            },
            Some("postgresql") | Some("postgres") => StorageConfig::Postgres {
                url: lookup("STRATA_POSTGRES_URL")
                    .ok_or(ConfigError::Missing("STRATA_POSTGRES_URL"))?,
                tenant_id: lookup("STRATA_TENANT_ID").unwrap_or_else(|| "default".to_string()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STRATA_STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        if let Some(v) = lookup("STRATA_AUTO_COMMIT") {
            cfg.auto_commit.enabled = parse_bool("STRATA_AUTO_COMMIT", &v)?;
        }
        if let Some(v) = lookup("STRATA_AUTO_COMMIT_L1") {
            cfg.auto_commit.max_l1_changes = parse("STRATA_AUTO_COMMIT_L1", &v)?;
        }
        if let Some(v) = lookup("STRATA_AUTO_COMMIT_TOTAL") {
            cfg.auto_commit.max_total_changes = parse("STRATA_AUTO_COMMIT_TOTAL", &v)?;
        }
        if let Some(v) = lookup("STRATA_MAX_MUTATIONS_PER_SESSION") {
            cfg.max_mutations_per_session = parse("STRATA_MAX_MUTATIONS_PER_SESSION", &v)?;
        }

        // STRATA_LAYER_L0=mutable:full, STRATA_LAYER_L2=immutable:none, ...
        for layer in Layer::ALL {
            let key = match layer {
                Layer::L0 => "STRATA_LAYER_L0",
                Layer::L1 => "STRATA_LAYER_L1",
                Layer::L2 => "STRATA_LAYER_L2",
            };
            if let Some(v) = lookup(key) {
                cfg.governance.set(layer, parse_layer_policy(key, &v)?);
            }
        }

        if let Some(v) = lookup("STRATA_BIND_ADDR") {
            cfg.bind_addr = parse("STRATA_BIND_ADDR", &v)?;
        }
        cfg.auth_token = lookup("STRATA_AUTH_TOKEN").filter(|t| !t.is_empty());

        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: value.to_string() }),
    }
}

fn parse_layer_policy(key: &'static str, value: &str) -> Result<LayerPolicy, ConfigError> {
    let invalid = || ConfigError::Invalid { key, value: value.to_string() };
    let (mutability, mode) = value.split_once(':').ok_or_else(invalid)?;
    let mutable = match mutability {
        "mutable" => true,
        "immutable" => false,
        _ => return Err(invalid()),
    };
    let mode: RecordingMode = mode.parse().map_err(|_| invalid())?;
    Ok(LayerPolicy::new(mutable, mode))
}
