//! The assembled engine: registry, store, and index behind one handle.
//!
//! Built exactly once by the loader before any operation is accepted,
//! then shared as `Arc<Engine>` across request handlers. Every field is
//! immutable after construction, so concurrent reads need no locking.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::config::SearchConfig;
use crate::error::QueryError;
use crate::index::SearchIndex;
use crate::models::{Category, ReferenceSetMeta, SearchHit};
use crate::registry::SchemaRegistry;
use crate::store::ReferenceStore;

pub const STANDARD_NAME: &str = "Cannabis Data Exchange Standard (CDES)";
pub const SPEC_VERSION: &str = "1.0.0";
pub const BASE_URI: &str = "https://schemas.terprint.com/cdes/v1/";

#[derive(Debug)]
pub struct Engine {
    pub registry: SchemaRegistry,
    pub store: ReferenceStore,
    pub index: SearchIndex,
    sets: Vec<ReferenceSetMeta>,
    overview: Value,
    loaded_at: DateTime<Utc>,
    /// SHA-256 over every loaded document, hex. Changes iff the dataset
    /// changes.
    fingerprint: String,
}

impl Engine {
    pub fn new(
        registry: SchemaRegistry,
        store: ReferenceStore,
        reference_sets: Vec<ReferenceSetMeta>,
        search: SearchConfig,
        fingerprint: String,
    ) -> Self {
        let index = SearchIndex::build(store.all(), search);
        let loaded_at = Utc::now();
        let overview = build_overview(&registry, &store, &reference_sets, loaded_at, &fingerprint);
        Engine {
            registry,
            store,
            index,
            sets: reference_sets,
            overview,
            loaded_at,
            fingerprint,
        }
    }

    /// Precomputed aggregate summary of the loaded dataset.
    pub fn overview(&self) -> &Value {
        &self.overview
    }

    /// Metadata for each loaded reference library, in load order.
    pub fn reference_sets(&self) -> &[ReferenceSetMeta] {
        &self.sets
    }

    /// Rebuild a reference library document by its file stem, for
    /// clients that read whole libraries instead of querying records.
    pub fn reference_resource(&self, name: &str) -> Result<Value, QueryError> {
        let set = self.sets.iter().find(|s| s.name == name).ok_or_else(|| {
            let available: Vec<&str> = self.sets.iter().map(|s| s.name.as_str()).collect();
            QueryError::not_found(format!(
                "reference set '{name}' not found (available: {})",
                available.join(", ")
            ))
        })?;
        let records: Vec<Value> = self
            .store
            .list(set.category)
            .iter()
            .map(|e| e.detail())
            .collect();
        let mut doc = Map::new();
        doc.insert("description".to_string(), json!(set.description));
        doc.insert("version".to_string(), json!(set.version));
        doc.insert("license".to_string(), json!(set.license));
        doc.insert(set.category.plural().to_string(), Value::Array(records));
        Ok(Value::Object(doc))
    }

    pub fn search(&self, query: &str, category: Option<Category>) -> Vec<SearchHit> {
        self.index.search(query, category)
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Payload for the health probe.
    pub fn health(&self) -> Value {
        let schemas: Vec<&str> = self
            .registry
            .list()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        json!({
            "status": "healthy",
            "service": "cdes-server",
            "version": env!("CARGO_PKG_VERSION"),
            "schemas": schemas,
            "references": {
                "terpenes": self.store.count(Category::Terpene),
                "cannabinoids": self.store.count(Category::Cannabinoid),
                "colors": self.store.count(Category::Color),
            },
            "loadedAt": self.loaded_at.to_rfc3339(),
            "datasetFingerprint": self.fingerprint,
        })
    }
}

fn build_overview(
    registry: &SchemaRegistry,
    store: &ReferenceStore,
    reference_sets: &[ReferenceSetMeta],
    loaded_at: DateTime<Utc>,
    fingerprint: &str,
) -> Value {
    let schemas: Vec<Value> = registry.list().iter().map(|d| d.summary()).collect();
    let sets: Vec<Value> = reference_sets
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "category": s.category,
                "description": s.description,
                "version": s.version,
                "license": s.license,
                "records": s.records,
            })
        })
        .collect();

    json!({
        "standard": STANDARD_NAME,
        "specVersion": SPEC_VERSION,
        "serverVersion": env!("CARGO_PKG_VERSION"),
        "schemaVersion": "JSON Schema Draft 2020-12",
        "baseUri": BASE_URI,
        "website": "https://www.cdes.world",
        "publisher": "Acidni LLC / Terprint",
        "licenses": {
            "code": "Apache-2.0",
            "specifications": "CC-BY-4.0",
            "referenceData": "CC0-1.0",
        },
        "schemas": schemas,
        "referenceDataSets": sets,
        "entityCounts": {
            "terpene": store.count(Category::Terpene),
            "cannabinoid": store.count(Category::Cannabinoid),
            "color": store.count(Category::Color),
        },
        "links": {
            "specification": "https://github.com/Acidni-LLC/cdes-spec",
            "referenceData": "https://github.com/Acidni-LLC/cdes-reference-data",
            "mcpServer": "https://github.com/Acidni-LLC/cdes-server",
        },
        "tools": [
            "list_schemas",
            "get_schema",
            "validate_data",
            "get_entity",
            "lookup_color",
            "list_entities",
            "search",
            "get_overview",
        ],
        "loadedAt": loaded_at.to_rfc3339(),
        "datasetFingerprint": fingerprint,
    })
}
