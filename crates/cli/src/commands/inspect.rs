use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use strata_kernel::verify::verify_chain;

use crate::store::{short_hash, short_timestamp, Store};

pub fn report(store: &Store) -> anyhow::Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Component", "Status", "Details"]);

    // 1. Backend
    let backend = store.backend.backend_type().to_string();
    let ready = if store.backend.is_ready() { "READY" } else { "UNAVAILABLE" };
    table.add_row(vec!["Backend", ready, &backend]);

    // 2. Ledger
    match store.backend.load_blocks() {
        Ok(None) => {
            table.add_row(vec!["Ledger", "EMPTY", "no chain written yet"]);
        }
        Ok(Some(blocks)) => {
            let report = verify_chain(&blocks);
            let status = if report.valid { "VALID" } else { "INVALID" };
            let details = match (report.failure, blocks.last()) {
                (Some(failure), _) => format!(
                    "{} blocks, first failure at {}: {}",
                    report.length, failure.index, failure.kind
                ),
                (None, Some(tip)) => format!(
                    "{} blocks, tip #{} {} at {}",
                    report.length,
                    tip.index,
                    short_hash(&tip.hash),
                    short_timestamp(&tip.timestamp)
                ),
                (None, None) => "0 blocks".to_string(),
            };
            table.add_row(vec!["Ledger", status, &details]);
        }
        Err(e) => {
            table.add_row(vec!["Ledger", "CORRUPT", &e.to_string()]);
        }
    }

    // 3. Pending changes
    let counts = store.pending.counts();
    let per_layer = counts
        .by_layer
        .iter()
        .map(|(layer, n)| format!("{}={}", layer, n))
        .collect::<Vec<_>>()
        .join(" ");
    let pending_status = if counts.total == 0 { "CLEAN" } else { "DIRTY" };
    table.add_row(vec![
        "Pending",
        pending_status,
        &format!("{} changes ({})", counts.total, per_layer),
    ]);

    // 4. Snapshots
    let count = store.snapshots.count()?;
    let latest = match store.snapshots.latest()? {
        Some(s) => format!(
            "{} snapshots, latest {} ({}) at {}",
            count,
            short_hash(&s.snapshot_hash),
            s.commit_type,
            short_timestamp(&s.created_at)
        ),
        None => "none".to_string(),
    };
    table.add_row(vec!["Snapshots", if count == 0 { "NONE" } else { "FOUND" }, &latest]);

    Ok(table)
}

pub fn run(store: &Store) -> anyhow::Result<()> {
    let table = report(store)?;
    println!("\nStrata Status Report");
    println!("--------------------");
    println!("Data dir: {:?}\n", store.config.data_dir);
    println!("{table}\n");
    Ok(())
}
