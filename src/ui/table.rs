use crate::inspect::{CollectionSummary, DanglingRecord, StoreSummary};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct CollectionRow {
    #[tabled(rename = "Collection")]
    name: String,
    #[tabled(rename = "Documents")]
    documents: usize,
}

#[derive(Tabled)]
struct StoreRow {
    #[tabled(rename = "Relation store")]
    name: String,
    #[tabled(rename = "Records")]
    records: usize,
}

#[derive(Tabled)]
struct DanglingRow {
    #[tabled(rename = "Store")]
    store: String,
    #[tabled(rename = "Record")]
    record: String,
    #[tabled(rename = "Missing")]
    missing: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn collections_table(collections: &[CollectionSummary]) -> String {
    render(
        collections
            .iter()
            .map(|c| CollectionRow {
                name: c.name.clone(),
                documents: c.documents,
            })
            .collect(),
    )
}

pub fn stores_table(stores: &[StoreSummary]) -> String {
    render(
        stores
            .iter()
            .map(|s| StoreRow {
                name: s.name.clone(),
                records: s.records,
            })
            .collect(),
    )
}

pub fn dangling_table(dangling: &[DanglingRecord]) -> String {
    render(
        dangling
            .iter()
            .map(|d| DanglingRow {
                store: d.store.clone(),
                record: d.record.to_string(),
                missing: d.missing.to_string(),
            })
            .collect(),
    )
}
