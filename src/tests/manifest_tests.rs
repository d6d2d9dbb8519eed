// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::layer::Layer;
use crate::manifest::{EntityDigest, LayerManifest, LayerManifests};
use std::vec::Vec;

fn manifest(entities: &[(&str, &str)]) -> LayerManifest {
    LayerManifest::from_digests(
        entities
            .iter()
            .map(|(id, content)| EntityDigest::of(*id, content.as_bytes()))
            .collect(),
    )
}

#[test]
fn test_manifest_sorted_and_order_independent() {
    let a = manifest(&[("b", "2"), ("a", "1")]);
    let b = manifest(&[("a", "1"), ("b", "2")]);
    assert_eq!(a, b);
    assert_eq!(a.entities[0].id, "a");
    assert_eq!(a.entity_count, 2);
    assert!(a.get("b").is_some());
    assert!(a.get("c").is_none());
}

#[test]
fn test_manifest_sensitivity_is_layer_local() {
    let before = LayerManifests {
        l0: manifest(&[("core_safety", "rules")]),
        l1: manifest(&[("notes", "v1"), ("ref", "r")]),
        l2: manifest(&[("scratch", "s")]),
    };
    let after = LayerManifests {
        l1: manifest(&[("notes", "v2"), ("ref", "r")]),
        ..before.clone()
    };

    assert_ne!(before.get(Layer::L1).manifest_hash, after.get(Layer::L1).manifest_hash);
    assert_eq!(before.get(Layer::L0).manifest_hash, after.get(Layer::L0).manifest_hash);
    assert_eq!(before.get(Layer::L2).manifest_hash, after.get(Layer::L2).manifest_hash);
}

#[test]
fn test_rename_changes_manifest() {
    assert_ne!(
        manifest(&[("a", "x")]).manifest_hash,
        manifest(&[("b", "x")]).manifest_hash
    );
}

#[test]
fn test_diff_added_removed_modified() {
    let old = manifest(&[("keep", "1"), ("edit", "1"), ("drop", "1")]);
    let new = manifest(&[("keep", "1"), ("edit", "2"), ("fresh", "1")]);

    let diff = new.diff_from(Some(&old));
    assert_eq!(diff.added, vec!["fresh"]);
    assert_eq!(diff.removed, vec!["drop"]);
    assert_eq!(diff.modified, vec!["edit"]);
    assert_eq!(diff.changed(), 3);

    let first = new.diff_from(None);
    assert_eq!(first.added.len(), 3);
    assert!(new.diff_from(Some(&new)).is_empty());
}

#[test]
fn test_empty_manifest_is_stable() {
    assert_eq!(LayerManifest::empty(), LayerManifest::from_digests(Vec::new()));
    assert_eq!(LayerManifest::empty().entity_count, 0);
}
