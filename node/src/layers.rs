// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read access to layer contents.
//!
//! The store itself is owned by collaborators. The core only needs to
//! enumerate entities per layer to build manifests, and to read the
//! governance entity.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use strata_kernel::layer::Layer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid entity id '{0}'")]
    InvalidId(String),

    #[error("layer source lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, LayerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntity {
    pub id: String,
    pub content: Vec<u8>,
}

impl LayerEntity {
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

pub trait LayerSource: Send + Sync {
    /// Every entity of `layer`, sorted by id.
    fn entities(&self, layer: Layer) -> Result<Vec<LayerEntity>>;

    fn entity(&self, layer: Layer, id: &str) -> Result<Option<LayerEntity>> {
        Ok(self.entities(layer)?.into_iter().find(|e| e.id == id))
    }
}

/// `<root>/l0`, `<root>/l1`, `<root>/l2`, walked recursively.
///
/// Entity ids are paths relative to the layer directory with `/`
/// separators. Dot-files are skipped. A missing layer directory is an
/// empty layer.
pub struct DirectoryLayerSource {
    root: PathBuf,
}

impl DirectoryLayerSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn layer_dir(&self, layer: Layer) -> PathBuf {
        self.root.join(layer.dir_name())
    }

    fn walk(base: &Path, dir: &Path, out: &mut Vec<LayerEntity>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::walk(base, &path, out)?;
            } else if file_type.is_file() {
                let id = entity_id(base, &path)?;
                out.push(LayerEntity::new(id, fs::read(&path)?));
            }
        }
        Ok(())
    }
}

fn entity_id(base: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(base)
        .map_err(|_| LayerError::InvalidId(path.display().to_string()))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Reject ids that would escape the layer directory.
fn id_to_relative_path(id: &str) -> Result<PathBuf> {
    let rel = PathBuf::from(id);
    let safe = !id.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(rel)
    } else {
        Err(LayerError::InvalidId(id.to_string()))
    }
}

impl LayerSource for DirectoryLayerSource {
    fn entities(&self, layer: Layer) -> Result<Vec<LayerEntity>> {
        let dir = self.layer_dir(layer);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        Self::walk(&dir, &dir, &mut out)?;
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn entity(&self, layer: Layer, id: &str) -> Result<Option<LayerEntity>> {
        let path = self.layer_dir(layer).join(id_to_relative_path(id)?);
        match fs::read(&path) {
            Ok(content) => Ok(Some(LayerEntity::new(id, content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory layers for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryLayerSource {
    layers: RwLock<BTreeMap<Layer, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryLayerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous content.
    pub fn put(
        &self,
        layer: Layer,
        id: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>> {
        let mut layers = self.layers.write().map_err(|_| LayerError::Poisoned)?;
        Ok(layers
            .entry(layer)
            .or_default()
            .insert(id.into(), content.into()))
    }

    pub fn remove(&self, layer: Layer, id: &str) -> Result<Option<Vec<u8>>> {
        let mut layers = self.layers.write().map_err(|_| LayerError::Poisoned)?;
        Ok(layers.get_mut(&layer).and_then(|entities| entities.remove(id)))
    }
}

impl LayerSource for MemoryLayerSource {
    fn entities(&self, layer: Layer) -> Result<Vec<LayerEntity>> {
        let layers = self.layers.read().map_err(|_| LayerError::Poisoned)?;
        Ok(layers
            .get(&layer)
            .map(|entities| {
                entities
                    .iter()
                    .map(|(id, content)| LayerEntity::new(id.clone(), content.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn entity(&self, layer: Layer, id: &str) -> Result<Option<LayerEntity>> {
        let layers = self.layers.read().map_err(|_| LayerError::Poisoned)?;
        Ok(layers
            .get(&layer)
            .and_then(|entities| entities.get(id))
            .map(|content| LayerEntity::new(id, content.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_source_walks_recursively() {
        let dir = tempdir().unwrap();
        let l1 = dir.path().join("l1");
        fs::create_dir_all(l1.join("skills")).unwrap();
        fs::write(l1.join("b.md"), "b").unwrap();
        fs::write(l1.join("skills").join("a.md"), "a").unwrap();
        fs::write(l1.join(".hidden"), "x").unwrap();

        let source = DirectoryLayerSource::new(dir.path());
        let ids: Vec<String> = source
            .entities(Layer::L1)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["b.md".to_string(), "skills/a.md".to_string()]);

        assert!(source.entities(Layer::L0).unwrap().is_empty());
        assert_eq!(
            source.entity(Layer::L1, "skills/a.md").unwrap().unwrap().content,
            b"a".to_vec()
        );
        assert!(source.entity(Layer::L1, "missing").unwrap().is_none());
    }

    #[test]
    fn test_directory_source_rejects_escaping_ids() {
        let dir = tempdir().unwrap();
        let source = DirectoryLayerSource::new(dir.path());
        assert!(matches!(
            source.entity(Layer::L0, "../secret"),
            Err(LayerError::InvalidId(_))
        ));
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryLayerSource::new();
        assert!(source.put(Layer::L1, "z", "1").unwrap().is_none());
        source.put(Layer::L1, "a", "2").unwrap();
        assert_eq!(source.put(Layer::L1, "z", "3").unwrap(), Some(b"1".to_vec()));

        let ids: Vec<String> = source
            .entities(Layer::L1)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "z".to_string()]);

        source.remove(Layer::L1, "a").unwrap();
        assert!(source.entity(Layer::L1, "a").unwrap().is_none());
        assert!(source.entities(Layer::L2).unwrap().is_empty());
    }
}
