// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Layer manifests.
//!
//! A manifest lists every entity of a layer with its content hash, sorted by
//! id, and rolls the list into one `manifest_hash`. Any single-entity change
//! anywhere in the layer changes the manifest hash.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::config::MANIFEST_DOMAIN;
use crate::hash::{content_hash, CanonicalHasher};
use crate::layer::Layer;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDigest {
    pub id: String,
    pub content_hash: String,
    pub size: u64,
}

impl EntityDigest {
    pub fn of(id: impl Into<String>, content: &[u8]) -> Self {
        Self {
            id: id.into(),
            content_hash: content_hash(content),
            size: content.len() as u64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerManifest {
    pub manifest_hash: String,
    pub entity_count: u64,
    pub entities: Vec<EntityDigest>,
}

impl LayerManifest {
    /// Sorts by id and computes the manifest hash.
    pub fn from_digests(mut entities: Vec<EntityDigest>) -> Self {
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        let manifest_hash = manifest_hash(&entities);
        Self {
            manifest_hash,
            entity_count: entities.len() as u64,
            entities,
        }
    }

    pub fn empty() -> Self {
        Self::from_digests(Vec::new())
    }

    pub fn get(&self, id: &str) -> Option<&EntityDigest> {
        self.entities
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
            .map(|pos| &self.entities[pos])
    }

    /// Set difference against an earlier manifest. `None` means everything is new.
    pub fn diff_from(&self, previous: Option<&LayerManifest>) -> LayerDiff {
        let before: BTreeMap<&str, &str> = previous
            .map(|m| {
                m.entities
                    .iter()
                    .map(|e| (e.id.as_str(), e.content_hash.as_str()))
                    .collect()
            })
            .unwrap_or_default();
        let after: BTreeMap<&str, &str> = self
            .entities
            .iter()
            .map(|e| (e.id.as_str(), e.content_hash.as_str()))
            .collect();

        let mut diff = LayerDiff::default();
        for (id, hash) in &after {
            match before.get(id) {
                None => diff.added.push(String::from(*id)),
                Some(prev) if prev != hash => diff.modified.push(String::from(*id)),
                Some(_) => {}
            }
        }
        for id in before.keys() {
            if !after.contains_key(id) {
                diff.removed.push(String::from(*id));
            }
        }
        diff
    }
}

/// `SHA256(domain || u64(n) || lp(id) || lp(content_hash) ...)` over entities sorted by id.
pub fn manifest_hash(sorted: &[EntityDigest]) -> String {
    let mut hasher = CanonicalHasher::new(MANIFEST_DOMAIN);
    hasher.write_u64(sorted.len() as u64);
    for entity in sorted {
        hasher.write_str(&entity.id);
        hasher.write_str(&entity.content_hash);
    }
    hasher.finish_hex()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl LayerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn changed(&self) -> u64 {
        (self.added.len() + self.removed.len() + self.modified.len()) as u64
    }
}

/// One manifest per layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerManifests {
    #[serde(rename = "L0")]
    pub l0: LayerManifest,
    #[serde(rename = "L1")]
    pub l1: LayerManifest,
    #[serde(rename = "L2")]
    pub l2: LayerManifest,
}

impl LayerManifests {
    pub fn get(&self, layer: Layer) -> &LayerManifest {
        match layer {
            Layer::L0 => &self.l0,
            Layer::L1 => &self.l1,
            Layer::L2 => &self.l2,
        }
    }
}
