use strata_kernel::proof::ChainProof;

use crate::store::Store;

/// Recompute every block hash. Fails on an invalid chain.
pub fn run(store: &Store) -> anyhow::Result<()> {
    let blocks = store.blocks()?;
    let (report, proof) = ChainProof::audit(&blocks);

    println!("{}", serde_json::to_string_pretty(&proof)?);
    match report.failure {
        Some(failure) => anyhow::bail!(
            "chain INVALID at block {}: {}",
            failure.index,
            failure.kind
        ),
        None => {
            println!("\nchain VALID ({} blocks)", report.length);
            Ok(())
        }
    }
}
