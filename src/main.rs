//! docgraph CLI - initialise and inspect an on-disk entity store

use anyhow::Context;
use clap::{Parser, Subcommand};
use docgraph::config::{self, DatabaseSection, StoreConfig};
use docgraph::inspect::Layout;
use docgraph::{ui, Database, EntityId, Side};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docgraph")]
#[command(version)]
#[command(about = "Embedded document store for entity graphs")]
#[command(long_about = r#"
docgraph stores entity graphs as one JSON document per entity, with
one-to-many and many-to-many links kept in flat relation files.

This tool inspects a store without needing the entity types:
  docgraph init --database ./db
  docgraph stats
  docgraph show books 0b9c3f6e-...
  docgraph check --repair
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = "docgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the store directory
    Init {
        /// Store directory (defaults to ./db)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Write documents on a single line
        #[arg(long)]
        compact: bool,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show collections and relation stores
    Stats {
        /// Store directory (overrides the config file)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List the identifiers stored in a collection
    List {
        /// Collection name
        collection: String,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print one raw document
    Show {
        /// Collection name
        collection: String,

        /// Entity identifier
        id: EntityId,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the records of a relation store
    Relations {
        /// Relation store name, e.g. authors_books
        store: String,

        /// Only show ids linked to this one
        #[arg(long)]
        id: Option<EntityId>,

        /// Position of --id in the records (owner or related)
        #[arg(long, default_value = "owner")]
        side: Side,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Find relation records that point at missing documents
    Check {
        /// Delete the dangling records
        #[arg(long)]
        repair: bool,

        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let loaded = config::load_config(Some(&cli.config))
        .with_context(|| format!("failed to read {}", cli.config.display()))?;

    match cli.command {
        Commands::Init { database, compact, force } => {
            let store_config = StoreConfig {
                database: DatabaseSection {
                    path: config::database_path(database.as_deref(), loaded.as_ref()),
                    pretty: !compact,
                },
            };

            config::write_config(&cli.config, &store_config, force)?;
            let db = Database::from_config(&store_config)?;

            ui::success(&format!("Initialised store at {}", db.base_dir().display()));
            ui::info("Config", &cli.config.display().to_string());
        }

        Commands::Stats { database } => {
            let layout = open_layout(database.as_deref(), loaded.as_ref())?;

            ui::header(&format!("docgraph store ({})", layout.base_dir().display()));
            if layout.collections.is_empty() && layout.relation_stores.is_empty() {
                println!("{}", ui::muted("  (empty)"));
                return Ok(());
            }

            ui::section("Collections");
            println!("{}", ui::collections_table(&layout.collections));
            if !layout.relation_stores.is_empty() {
                ui::section("Relation stores");
                println!("{}", ui::stores_table(&layout.relation_stores));
            }
        }

        Commands::List { collection, database } => {
            let layout = open_layout(database.as_deref(), loaded.as_ref())?;
            if !layout.has_collection(&collection) {
                anyhow::bail!("no collection named {}", collection);
            }

            let ids = layout.ids(&collection)?;
            ui::header(&format!("{} ({} document(s))", collection, ids.len()));
            for id in ids {
                ui::id_line(id);
            }
        }

        Commands::Show { collection, id, database } => {
            let layout = open_layout(database.as_deref(), loaded.as_ref())?;
            let Some(document) = layout.document(&collection, id)? else {
                anyhow::bail!("{}[{}] does not exist", collection, id);
            };

            ui::header(&format!("{}[{}]", collection, id));
            ui::document(&document);
        }

        Commands::Relations { store, id, side, database } => {
            let layout = open_layout(database.as_deref(), loaded.as_ref())?;
            if !layout.has_relation_store(&store) {
                anyhow::bail!("no relation store named {}", store);
            }
            let relations = layout.relation_store(&store);

            match id {
                Some(id) => {
                    let related = relations.related_ids(id, side)?;
                    ui::header(&format!("{} linked to {} ({} id(s))", store, id, related.len()));
                    for related_id in related {
                        ui::id_line(related_id);
                    }
                }
                None => {
                    let records = relations.records()?;
                    ui::header(&format!("{} ({} record(s))", store, records.len()));
                    for record in &records {
                        ui::record_line(record);
                    }
                }
            }
        }

        Commands::Check { repair, database } => {
            let layout = open_layout(database.as_deref(), loaded.as_ref())?;
            let dangling = layout.check()?;

            if dangling.is_empty() {
                ui::success("No dangling relation records");
                return Ok(());
            }

            ui::warn(&format!("{} dangling relation record(s)", dangling.len()));
            println!("{}", ui::dangling_table(&dangling));

            if repair {
                let removed = layout.repair(&dangling)?;
                ui::success(&format!("Removed {} record(s)", removed));
            } else {
                println!("{}", ui::dim("Run with --repair to delete them."));
            }
        }
    }

    Ok(())
}

fn open_layout(database: Option<&Path>, loaded: Option<&StoreConfig>) -> anyhow::Result<Layout> {
    let path = config::database_path(database, loaded);
    if !path.is_dir() {
        anyhow::bail!("no store at {} (run `docgraph init` first)", path.display());
    }

    Layout::scan(&path).with_context(|| format!("failed to scan {}", path.display()))
}
