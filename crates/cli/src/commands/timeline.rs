use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::store::{short_hash, short_timestamp, Store};

pub fn table(store: &Store, limit: usize, record_type: Option<&str>) -> anyhow::Result<Table> {
    let blocks = store.blocks()?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Timestamp", "Records", "Entries", "Hash"]);

    let selected = blocks
        .iter()
        .rev()
        .filter(|b| record_type.map_or(true, |t| b.has_record_type(t)))
        .take(limit);

    for block in selected {
        let types = block.record_types();
        let records = if block.is_genesis() {
            "genesis".to_string()
        } else if types.is_empty() {
            "-".to_string()
        } else {
            types.join(", ")
        };
        table.add_row(vec![
            block.index.to_string(),
            short_timestamp(&block.timestamp),
            records,
            block.data.len().to_string(),
            short_hash(&block.hash).to_string(),
        ]);
    }

    Ok(table)
}

pub fn run(store: &Store, limit: usize, record_type: Option<&str>) -> anyhow::Result<()> {
    let table = table(store, limit, record_type)?;
    println!("\nBlock Timeline (newest first)\n");
    println!("{table}\n");
    Ok(())
}
