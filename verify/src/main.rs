use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use strata_kernel::block::Block;
use strata_kernel::proof::ChainProof;
use strata_kernel::snapshot::Snapshot;
use strata_kernel::verify::ChainReport;

/// Record type written by the commit service for every snapshot.
const STATE_COMMIT_RECORD: &str = "state_commit";

#[derive(Parser, Debug)]
#[command(author, version, about = "Independent auditor for Strata ledgers", long_about = None)]
struct Args {
    /// Exported chain (blocks.json: JSON array of blocks)
    chain: PathBuf,

    /// Snapshot files to check against the chain
    #[arg(long = "snapshot", short)]
    snapshots: Vec<PathBuf>,
}

#[derive(Serialize, Debug)]
struct SnapshotCheck {
    path: String,
    snapshot_hash: String,
    /// Stored hashes match the manifests and metadata.
    consistent: bool,
    block_index: Option<u64>,
    /// The commit block at `block_index` names this snapshot.
    anchored: bool,
}

#[derive(Serialize, Debug)]
struct AuditReport {
    chain: ChainReport,
    proof: ChainProof,
    snapshots: Vec<SnapshotCheck>,
}

impl AuditReport {
    fn passed(&self) -> bool {
        self.chain.valid && self.snapshots.iter().all(|s| s.consistent && s.anchored)
    }
}

/// The commit block at `snapshot.block_index` must carry a `state_commit`
/// record naming the snapshot.
fn is_anchored(blocks: &[Block], snapshot: &Snapshot) -> bool {
    let Some(index) = snapshot.block_index else {
        return false;
    };
    let Some(block) = blocks.get(index as usize) else {
        return false;
    };

    block.data.iter().any(|entry| {
        serde_json::from_str::<serde_json::Value>(entry)
            .map(|record| {
                record["type"] == STATE_COMMIT_RECORD
                    && record["snapshot_hash"] == snapshot.snapshot_hash.as_str()
            })
            .unwrap_or(false)
    })
}

fn check_snapshot(blocks: &[Block], path: String, snapshot: &Snapshot) -> SnapshotCheck {
    SnapshotCheck {
        path,
        snapshot_hash: snapshot.snapshot_hash.clone(),
        consistent: snapshot.is_consistent(),
        block_index: snapshot.block_index,
        anchored: is_anchored(blocks, snapshot),
    }
}

fn audit(blocks: &[Block], snapshots: &[(String, Snapshot)]) -> AuditReport {
    let (chain, proof) = ChainProof::audit(blocks);
    let snapshots = snapshots
        .iter()
        .map(|(path, snapshot)| check_snapshot(blocks, path.clone(), snapshot))
        .collect();
    AuditReport {
        chain,
        proof,
        snapshots,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("Strata Verifier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Protocol: v{}", strata_kernel::config::PROTOCOL_VERSION);

    // 1. Load chain
    let raw = fs::read(&args.chain)
        .with_context(|| format!("Failed to read chain file {:?}", args.chain))?;
    let blocks: Vec<Block> =
        serde_json::from_slice(&raw).context("Chain file is not a JSON array of blocks")?;

    // 2. Load snapshots
    let mut snapshots = Vec::with_capacity(args.snapshots.len());
    for path in &args.snapshots {
        let raw = fs::read(path).with_context(|| format!("Failed to read snapshot {:?}", path))?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("Snapshot {:?} is not valid JSON", path))?;
        snapshots.push((path.display().to_string(), snapshot));
    }

    // 3. Recompute everything
    let report = audit(&blocks, &snapshots);

    // 4. Output JSON
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.passed() {
        if let Some(failure) = report.chain.failure {
            eprintln!("FAILED at block {}: {}", failure.index, failure.kind);
        } else {
            eprintln!("FAILED: snapshot check");
        }
        std::process::exit(1);
    }
    Ok(())
}
