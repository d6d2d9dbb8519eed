use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::store::{short_hash, short_timestamp, Store};

pub fn table(store: &Store, limit: usize) -> anyhow::Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Hash", "Created", "Type", "By", "Block", "Changes", "Reason"]);

    for s in store.snapshots.list_snapshots(limit)? {
        table.add_row(vec![
            short_hash(&s.snapshot_hash).to_string(),
            short_timestamp(&s.created_at),
            s.commit_type.to_string(),
            s.created_by.clone(),
            s.block_index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
            s.changes_since_last.len().to_string(),
            s.reason.clone(),
        ]);
    }
    Ok(table)
}

pub fn run(store: &Store, limit: usize) -> anyhow::Result<()> {
    let table = table(store, limit)?;
    println!("\nSnapshots (newest first)\n");
    println!("{table}\n");
    Ok(())
}
