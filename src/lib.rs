//! # CDES Server
//!
//! **Schema registry, validation, and reference-data search for the
//! Cannabis Data Exchange Standard.**
//!
//! CDES Server loads the standard's JSON Schemas and reference libraries
//! (terpenes, cannabinoids, display colors) from disk into an immutable
//! in-memory engine, validates documents against the schemas, and exposes
//! lookup and weighted free-text search via a CLI and an MCP-compatible
//! HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────────┐
//! │  JSON files  │──▶│         Loader          │
//! │ schemas+refs │   │ parse → verify → index  │
//! └──────────────┘   └────────────┬────────────┘
//!                                 │
//!                          ┌──────▼──────┐
//!                          │   Engine    │
//!                          │ registry +  │
//!                          │ store+index │
//!                          └──────┬──────┘
//!                 ┌───────────────┤
//!                 ▼               ▼
//!            ┌──────────┐   ┌──────────┐
//!            │   CLI    │   │   HTTP   │
//!            │  (cdes)  │   │ REST+MCP │
//!            └──────────┘   └──────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **loader** ([`loader`]) walks the configured dataset directories,
//!    parses every JSON document, and fails fast on the first malformed file.
//! 2. Schemas land in the **registry** ([`registry`]), which verifies every
//!    `$ref` and rejects reference cycles before serving begins.
//! 3. Reference records are normalized into [`models::ReferenceEntity`]s held
//!    by the **store** ([`store`]) behind id, name, and alias lookup tables.
//! 4. The **search index** ([`index`]) tokenizes entity text into postings
//!    for weighted free-text search.
//! 5. The **validator** ([`validate`]) walks documents against registered
//!    schemas and reports violations as data, never as transport errors.
//! 6. Operations are exposed through the **tool facade** ([`tools`]), the
//!    **CLI** (`cdes`), the **REST server** ([`server`]), and **MCP** ([`mcp`]).
//!
//! ## Quick Start
//!
//! ```bash
//! cdes schemas                         # list loaded schemas
//! cdes validate strain ./strain.json   # validate a document
//! cdes search "citrus"                 # search reference data
//! cdes serve                           # start HTTP + MCP server
//! ```
//!
//! ## Operations
//!
//! | Tool | Purpose |
//! |------|---------|
//! | `list_schemas` | Summaries of every loaded schema |
//! | `get_schema` | Full JSON Schema document by name |
//! | `validate_data` | Validate a document, returning structured violations |
//! | `get_entity` | Reference entity by category and id or name |
//! | `lookup_color` | Display color assigned to a terpene |
//! | `list_entities` | Entity summaries for one category |
//! | `search` | Weighted free-text search across reference data |
//! | `get_overview` | Standard metadata, licenses, and dataset counts |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Load-time (fatal) and per-call error types |
//! | [`models`] | Core data types: `SchemaDocument`, `ReferenceEntity`, `ValidationResult`, `SearchHit` |
//! | [`loader`] | Dataset loading: walk, parse, normalize, fingerprint |
//! | [`registry`] | Schema registry with `$ref` resolution and verification |
//! | [`validate`] | Structural JSON Schema validation walker |
//! | [`store`] | Reference entity store with id/name/alias lookup |
//! | [`index`] | Inverted search index with weighted ranking |
//! | [`engine`] | Assembled immutable engine shared across handlers |
//! | [`tools`] | `Tool` trait, registry, and the eight built-in operations |
//! | [`server`] | HTTP server (Axum) with CORS and the error envelope |
//! | [`mcp`] | MCP Streamable HTTP service over the same tool registry |
//!
//! ## Configuration
//!
//! CDES Server is configured via a TOML file (default: `config/cdes.toml`).
//! See [`config`] for all available options and [`config::load_config`] for
//! validation rules.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod mcp;
pub mod models;
pub mod registry;
pub mod server;
pub mod store;
pub mod tools;
pub mod validate;

pub use engine::Engine;
pub use error::{LoadError, QueryError};
pub use models::{Category, ReferenceEntity, SchemaDocument, SearchHit, ValidationResult, Violation};
pub use tools::{Tool, ToolContext, ToolRegistry};
