use crate::collection::Document;
use crate::entity::EntityId;
use crate::relation::RelationRecord;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn id_line(id: EntityId) {
    println!("  {}", id.style(theme().id.clone()));
}

pub fn record_line(record: &RelationRecord) {
    println!(
        "  {} {} {}",
        record.owner.style(theme().id.clone()),
        "→".style(theme().muted.clone()),
        record.related.style(theme().id.clone())
    );
}

/// Print a raw document, one key per line in stored order
pub fn document(doc: &Document) {
    for (key, value) in doc {
        println!("  {}: {}", key.style(theme().key.clone()), value);
    }
}
