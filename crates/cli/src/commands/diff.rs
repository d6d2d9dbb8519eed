use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use strata_kernel::layer::Layer;
use strata_kernel::snapshot::SnapshotDiff;

use crate::store::{short_hash, Store};

/// Per-layer changes going from snapshot `from` to snapshot `to`.
pub fn compare(store: &Store, from: &str, to: &str) -> anyhow::Result<(String, String, SnapshotDiff)> {
    let a = store.snapshots.load_snapshot(from)?;
    let b = store.snapshots.load_snapshot(to)?;
    let diff = SnapshotDiff::between(Some(&a.layers), &b.layers, &b.changes_since_last);
    Ok((a.snapshot_hash, b.snapshot_hash, diff))
}

pub fn table(diff: &SnapshotDiff) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Layer", "Change", "Entity"]);

    for layer in Layer::ALL {
        let d = diff.get(layer);
        for (kind, ids) in [("added", &d.added), ("removed", &d.removed), ("modified", &d.modified)] {
            for id in ids {
                table.add_row(vec![layer.as_str(), kind, id.as_str()]);
            }
        }
    }
    table
}

pub fn run(store: &Store, from: &str, to: &str) -> anyhow::Result<()> {
    let (a, b, diff) = compare(store, from, to)?;
    let status = if diff.is_empty() { "IDENTICAL" } else { "CHANGED" };

    println!("\nSnapshot Comparison");
    println!("-------------------");
    println!("From:   {}", short_hash(&a));
    println!("To:     {}", short_hash(&b));
    println!("Status: {}\n", status);
    if !diff.is_empty() {
        println!("{}\n", table(&diff));
    }
    Ok(())
}
