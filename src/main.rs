//! # CDES Server CLI (`cdes`)
//!
//! The `cdes` binary is the primary interface to the CDES dataset. It
//! provides commands for serving the HTTP/MCP API and for querying the
//! loaded schemas and reference data directly from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! cdes --config ./config/cdes.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cdes serve` | Start the HTTP and MCP server |
//! | `cdes schemas` | List loaded schemas |
//! | `cdes validate <schema> <file>` | Validate a JSON file against a schema |
//! | `cdes entities <category>` | List reference entities in a category |
//! | `cdes get <category> <id>` | Print one entity's full record |
//! | `cdes color <terpene>` | Look up a terpene's display color |
//! | `cdes search "<query>"` | Search reference data |
//! | `cdes overview` | Print the standard overview |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! cdes serve --config ./config/cdes.toml
//!
//! # Validate a strain document
//! cdes validate strain ./my-strain.json
//!
//! # Look up a cannabinoid by name
//! cdes get cannabinoid THC
//!
//! # Search across all reference data
//! cdes search "citrus" --category terpene
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use cdes_server::models::Category;
use cdes_server::{config, loader, server, validate};

/// CDES Server CLI — schema registry, validation, and reference-data
/// search for the Cannabis Data Exchange Standard.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cdes.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cdes",
    about = "CDES Server — schema registry, validation, and reference-data search for the Cannabis Data Exchange Standard",
    version,
    long_about = "CDES Server loads the Cannabis Data Exchange Standard's JSON Schemas and \
    reference libraries (terpenes, cannabinoids, display colors) into an in-memory engine, \
    validates documents against the schemas, and exposes lookup and free-text search via a \
    CLI and an MCP-compatible HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cdes.toml`. Dataset locations, the bind
    /// address, and search weights are read from this file.
    #[arg(long, global = true, default_value = "./config/cdes.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and MCP server.
    ///
    /// Loads the full dataset, then binds to the address configured in
    /// `[server].bind` and serves the REST endpoints plus the MCP
    /// Streamable HTTP endpoint at `/mcp`. A malformed dataset aborts
    /// startup before the socket is bound.
    Serve,

    /// List loaded schemas.
    ///
    /// Prints one line per schema with its title and property count,
    /// in canonical (alphabetical) order.
    Schemas,

    /// Validate a JSON document against a named schema.
    ///
    /// Prints each violation with its path and exits nonzero when the
    /// document is invalid.
    Validate {
        /// Schema name (e.g., `strain`, `coa`).
        schema: String,

        /// Path to the JSON document to validate.
        file: PathBuf,
    },

    /// List reference entities in a category.
    Entities {
        /// One of `terpene`, `cannabinoid`, or `color`.
        category: Category,
    },

    /// Print one entity's full record as JSON.
    ///
    /// Accepts the entity id or its display name, case-insensitively.
    Get {
        /// One of `terpene`, `cannabinoid`, or `color`.
        category: Category,

        /// Entity id or display name (e.g., `myrcene`, `THC`).
        id: String,
    },

    /// Look up the display color assigned to a terpene.
    Color {
        /// Terpene name (e.g., `limonene`).
        terpene: String,
    },

    /// Search reference data.
    ///
    /// Ranks entities by token match weight and prints them with
    /// scores and the fields that matched.
    Search {
        /// The search query string.
        query: String,

        /// Restrict results to one category (`terpene`, `cannabinoid`, `color`).
        #[arg(long)]
        category: Option<Category>,
    },

    /// Print the standard overview (versions, licenses, dataset counts).
    Overview,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let engine = loader::load(&cfg)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg, Arc::new(engine)).await?;
        }
        Commands::Schemas => {
            let docs = engine.registry.list();
            println!("{} schema(s) loaded:", docs.len());
            for doc in docs {
                let props = doc
                    .raw
                    .get("properties")
                    .and_then(|p| p.as_object())
                    .map_or(0, |m| m.len());
                println!("  {:<24} {} ({} properties)", doc.name, doc.title, props);
            }
        }
        Commands::Validate { schema, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let data: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let result = validate::validate(&engine.registry, &schema, &data)?;
            if result.is_valid {
                println!("{} is valid against '{}'", file.display(), schema);
            } else {
                for v in &result.violations {
                    println!("  {}: {}", v.path, v.message);
                }
                anyhow::bail!(
                    "{} violation(s) against '{}'",
                    result.violations.len(),
                    schema
                );
            }
        }
        Commands::Entities { category } => {
            let entities = engine.store.list(category);
            println!("{} {} entities:", entities.len(), category);
            for e in entities {
                println!("  {:<24} {}", e.id, e.display_name);
            }
        }
        Commands::Get { category, id } => {
            let entity = engine.store.get(category, &id)?;
            println!("{}", serde_json::to_string_pretty(&entity.detail())?);
        }
        Commands::Color { terpene } => {
            let entity = engine.store.get(Category::Color, &terpene)?;
            println!("{}", serde_json::to_string_pretty(&entity.detail())?);
        }
        Commands::Search { query, category } => {
            let hits = engine.search(&query, category);
            println!("{} result(s) for \"{}\":", hits.len(), query);
            for hit in hits {
                println!(
                    "  {:>6.2}  {:<24} ({}) [{}]",
                    hit.score,
                    hit.entity_id,
                    hit.category,
                    hit.matched_fields.join(", ")
                );
            }
        }
        Commands::Overview => {
            println!("{}", serde_json::to_string_pretty(&engine.overview())?);
        }
    }

    Ok(())
}
