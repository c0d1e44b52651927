//! Core data models for the CDES engine.
//!
//! These types represent the schemas, reference entities, and operation
//! results that flow through the registry, store, index, and query facade.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Which reference library an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Terpene,
    Cannabinoid,
    Color,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Terpene => "terpene",
            Category::Cannabinoid => "cannabinoid",
            Category::Color => "color",
        }
    }

    /// Key under which a reference library file stores its records.
    pub fn plural(&self) -> &'static str {
        match self {
            Category::Terpene => "terpenes",
            Category::Cannabinoid => "cannabinoids",
            Category::Color => "colors",
        }
    }

    pub const ALL: [Category; 3] = [Category::Terpene, Category::Cannabinoid, Category::Color];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terpene" => Ok(Category::Terpene),
            "cannabinoid" => Ok(Category::Cannabinoid),
            "color" => Ok(Category::Color),
            other => Err(format!(
                "unknown category '{other}' (expected terpene, cannabinoid, or color)"
            )),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A loaded CDES schema document.
///
/// `raw` is the full JSON Schema as read from disk; the other fields are
/// extracted once at load so listings never re-walk the document.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Canonical name, the file stem (e.g. `strain`, `terpene-profile`).
    pub name: String,
    pub title: String,
    pub description: String,
    /// The `$id` URI, empty when the schema does not declare one.
    pub schema_id: String,
    /// Top-level `required` entries in declaration order.
    pub required_fields: Vec<String>,
    pub raw: Value,
}

impl SchemaDocument {
    /// Summary row used by schema listings and the overview.
    pub fn summary(&self) -> Value {
        let property_count = self
            .raw
            .get("properties")
            .and_then(Value::as_object)
            .map(Map::len)
            .unwrap_or(0);
        json!({
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "schemaId": self.schema_id,
            "required": self.required_fields,
            "propertyCount": property_count,
        })
    }
}

/// One record from a reference library.
///
/// `fields` holds the source record verbatim; `id`, `display_name`, and
/// `aliases` are normalized lookup keys extracted at load time.
#[derive(Debug, Clone)]
pub struct ReferenceEntity {
    /// Stable identifier, lowercase (e.g. `terpene:myrcene`).
    pub id: String,
    pub display_name: String,
    pub category: Category,
    /// Alternate lookup names (full names, bare color keys). Matched
    /// case-insensitively together with `display_name`.
    pub aliases: Vec<String>,
    pub fields: Map<String, Value>,
}

impl ReferenceEntity {
    /// Full record as loaded, returned by detail lookups.
    pub fn detail(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Category-specific summary row for listings.
    pub fn summary(&self) -> Value {
        match self.category {
            Category::Terpene => json!({
                "id": self.field("id"),
                "name": self.field("name"),
                "casNumber": self.field("casNumber"),
                "category": self.field("category"),
                "aroma": self.field_or("aroma", json!([])),
                "boilingPoint": self.field("boilingPoint"),
            }),
            Category::Cannabinoid => json!({
                "id": self.field("id"),
                "name": self.field("name"),
                "fullName": self.field("fullName"),
                "psychoactive": self.field("psychoactive"),
                "color": self.field("color"),
                "effects": self.field_or("effects", json!([])),
            }),
            Category::Color => json!({
                "terpene": self.field("terpene"),
                "hex": self.field("hex"),
                "rgb": self.field("rgb"),
            }),
        }
    }

    /// Every top-level field paired with the concatenation of all string
    /// values found under it. Feeds the search index; nothing is stored.
    pub fn text_fields(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (key, value) in &self.fields {
            let mut buf = String::new();
            collect_strings(value, &mut buf);
            if !buf.is_empty() {
                out.push((key.clone(), buf));
            }
        }
        out
    }

    fn field(&self, key: &str) -> Value {
        self.fields.get(key).cloned().unwrap_or(Value::Null)
    }

    fn field_or(&self, key: &str, default: Value) -> Value {
        self.fields.get(key).cloned().unwrap_or(default)
    }
}

/// Set-level metadata from one reference file, kept for the overview
/// and the resource listing.
#[derive(Debug, Clone)]
pub struct ReferenceSetMeta {
    /// File stem (e.g. `terpene-library`).
    pub name: String,
    pub category: Category,
    pub description: String,
    pub version: String,
    pub license: String,
    pub records: usize,
}

/// One rule failure found while validating a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Dotted, zero-indexed location (e.g. `terpeneProfile.myrcene`,
    /// `aroma.1`), or `(root)` for the document itself.
    pub path: String,
    pub message: String,
    /// Declared type, allowed enum values, or required field name.
    pub expected: Value,
    /// Observed type or value; null for a missing field.
    pub actual: Value,
}

impl Violation {
    pub fn new(
        path: impl Into<String>,
        message: impl Into<String>,
        expected: Value,
        actual: Value,
    ) -> Self {
        Violation {
            path: path.into(),
            message: message.into(),
            expected,
            actual,
        }
    }
}

/// Outcome of one validation call. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        ValidationResult {
            is_valid: violations.is_empty(),
            violations,
        }
    }
}

/// One ranked search result. Ordering is by descending score, then
/// ascending entity id, so equal inputs always produce equal output.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entity_id: String,
    pub category: Category,
    pub score: f64,
    /// Top-level field names the query matched in, sorted.
    pub matched_fields: Vec<String>,
}

fn collect_strings(value: &Value, buf: &mut String) {
    match value {
        Value::String(s) => {
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(s);
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, buf);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect_strings(v, buf);
            }
        }
        _ => {}
    }
}
