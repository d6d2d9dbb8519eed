// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::block::Block;
use crate::config::{EMPTY_MERKLE_ROOT, GENESIS_TIMESTAMP, ZERO_HASH};
use crate::verify::{is_valid_chain, verify_chain, FailureKind};
use std::string::{String, ToString};
use std::vec::Vec;

fn ts(i: u64) -> String {
    format!("2025-01-01T00:00:{:02}Z", i)
}

fn build_chain(payloads: &[&[&str]]) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for (i, payload) in payloads.iter().enumerate() {
        let data = payload.iter().map(|s| s.to_string()).collect();
        let next = chain.last().unwrap().next(ts(i as u64 + 1), data);
        chain.push(next);
    }
    chain
}

#[test]
fn test_genesis_invariant() {
    let genesis = Block::genesis();
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
    assert!(genesis.data.is_empty());
    assert_eq!(genesis.previous_hash, ZERO_HASH);
    assert_eq!(genesis.merkle_root, EMPTY_MERKLE_ROOT);
    assert_eq!(genesis.hash, genesis.recompute_hash());

    assert!(is_valid_chain(&[genesis]));
}

#[test]
fn test_empty_chain_is_valid() {
    let report = verify_chain(&[]);
    assert!(report.valid);
    assert_eq!(report.length, 0);
}

#[test]
fn test_three_block_scenario() {
    let chain = build_chain(&[&["a"], &["b", "c"]]);
    assert_eq!(chain.len(), 3);
    assert!(is_valid_chain(&chain));
    assert_eq!(chain[2].previous_hash, chain[1].hash);
    assert_eq!(chain[1].previous_hash, chain[0].hash);
}

#[test]
fn test_tampered_data_detected() {
    let mut chain = build_chain(&[&["a"], &["b", "c"], &["d"]]);
    chain[2].data[1] = "C".to_string();

    let report = verify_chain(&chain);
    assert!(!report.valid);
    let failure = report.failure.unwrap();
    assert_eq!(failure.index, 2);
    assert_eq!(failure.kind, FailureKind::MerkleMismatch);
}

#[test]
fn test_single_byte_flip_in_every_field_detected() {
    let chain = build_chain(&[&["alpha"], &["beta", "gamma"], &["delta"]]);

    for target in 0..chain.len() {
        for field in 0..3 {
            let mut tampered = chain.clone();
            let block = &mut tampered[target];
            let value = match field {
                0 => {
                    if block.data.is_empty() {
                        continue;
                    }
                    &mut block.data[0]
                }
                1 => &mut block.hash,
                _ => &mut block.previous_hash,
            };
            let mut bytes = value.clone().into_bytes();
            bytes[0] ^= 0x01;
            *value = String::from_utf8(bytes).unwrap();

            assert!(
                !is_valid_chain(&tampered),
                "flip in block {} field {} went unnoticed",
                target,
                field
            );
        }
    }
}

#[test]
fn test_recomputed_tamper_breaks_link() {
    // Rewrite a block and reseal it: its own hash checks out but the successor link breaks.
    let mut chain = build_chain(&[&["a"], &["b"], &["c"]]);
    let forged = Block::new(2, chain[2].timestamp.clone(), vec!["B".to_string()], chain[1].hash.clone());
    chain[2] = forged;

    let report = verify_chain(&chain);
    assert_eq!(report.failure.unwrap().index, 3);
    assert_eq!(report.failure.unwrap().kind, FailureKind::LinkMismatch);
}

#[test]
fn test_corrupted_genesis_detected() {
    let mut chain = build_chain(&[&["a"]]);
    chain[0] = Block::new(0, ts(0), Vec::new(), ZERO_HASH.to_string());
    chain[1] = Block::new(1, ts(1), vec!["a".to_string()], chain[0].hash.clone());

    let report = verify_chain(&chain);
    assert_eq!(report.failure.unwrap().kind, FailureKind::GenesisMismatch);
}

#[test]
fn test_index_gap_detected() {
    let mut chain = build_chain(&[&["a"], &["b"]]);
    chain.remove(1);
    let report = verify_chain(&chain);
    assert_eq!(report.failure.unwrap().kind, FailureKind::IndexMismatch);
}

#[test]
fn test_record_types() {
    let block = Block::genesis().next(
        ts(1),
        vec![
            r#"{"type":"state_commit","reason":"t"}"#.to_string(),
            "free text".to_string(),
            r#"{"type":"knowledge_update"}"#.to_string(),
        ],
    );
    assert_eq!(block.record_types(), vec!["state_commit", "knowledge_update"]);
    assert!(block.has_record_type("state_commit"));
    assert!(!block.has_record_type("rule_transition"));
}
