// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::change::{ChangeAction, PendingChange};
use crate::layer::Layer;
use crate::manifest::{EntityDigest, LayerManifest, LayerManifests};
use crate::snapshot::{CommitType, Snapshot, SnapshotDiff};
use std::string::ToString;
use std::vec::Vec;

fn layers(l1_content: &str) -> LayerManifests {
    LayerManifests {
        l0: LayerManifest::from_digests(vec![EntityDigest::of("core_safety", b"rules")]),
        l1: LayerManifest::from_digests(vec![EntityDigest::of("notes", l1_content.as_bytes())]),
        l2: LayerManifest::empty(),
    }
}

fn snapshot(l1_content: &str, reason: &str) -> Snapshot {
    Snapshot::new(
        "2025-01-01T00:00:00Z".to_string(),
        CommitType::Explicit,
        "tester".to_string(),
        reason.to_string(),
        layers(l1_content),
        Vec::new(),
        SnapshotDiff::default(),
    )
}

#[test]
fn test_snapshot_hash_is_content_derived() {
    let a = snapshot("v1", "r");
    let b = snapshot("v1", "r");
    assert_eq!(a.snapshot_hash, b.snapshot_hash);
    assert_ne!(a.snapshot_hash, snapshot("v2", "r").snapshot_hash);
    assert_ne!(a.snapshot_hash, snapshot("v1", "other").snapshot_hash);
    assert!(a.is_consistent());
}

#[test]
fn test_snapshot_tamper_detected() {
    let mut s = snapshot("v1", "r");
    s.layers.l1.entities[0].content_hash = crate::hash::content_hash(b"forged");
    assert!(!s.is_consistent());
}

#[test]
fn test_diff_summary_counts() {
    let previous = layers("v1");
    let mut current = layers("v2");
    current.l1 = LayerManifest::from_digests(vec![
        EntityDigest::of("notes", b"v2"),
        EntityDigest::of("fresh", b"n"),
    ]);
    current.l2 = LayerManifest::from_digests(vec![EntityDigest::of("tmp", b"t")]);

    let changes = vec![
        PendingChange::new(Layer::L1, ChangeAction::Update, "notes", "edit", "t"),
        PendingChange::new(Layer::L1, ChangeAction::Promote, "fresh", "promote", "t"),
    ];

    let diff = SnapshotDiff::between(Some(&previous), &current, &changes);
    assert_eq!(diff.summary.l0_changed, 0);
    assert_eq!(diff.summary.l1_added, 1);
    assert_eq!(diff.summary.l1_modified, 1);
    assert_eq!(diff.summary.l1_deleted, 0);
    assert_eq!(diff.summary.l2_changed, 1);
    assert_eq!(diff.summary.promotions, 1);
    assert_eq!(diff.summary.pending_total, 2);
}

#[test]
fn test_snapshot_json_shape() {
    let s = snapshot("v1", "r");
    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["commit_type"], "explicit");
    assert!(json["layers"]["L0"]["manifest_hash"].is_string());
    assert!(json["layers"]["L2"]["entities"].as_array().unwrap().is_empty());
}
