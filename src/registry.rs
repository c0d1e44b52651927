//! Schema registry: owns every loaded [`SchemaDocument`] and resolves
//! cross-schema `$ref` targets by canonical name.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LoadError, QueryError};
use crate::models::SchemaDocument;

/// Insertion-ordered collection of schemas, keyed by canonical name.
/// Built once by the loader; read-only afterwards.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    docs: Vec<SchemaDocument>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: SchemaDocument) {
        self.by_name.insert(doc.name.clone(), self.docs.len());
        self.docs.push(doc);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All schemas in load order.
    pub fn list(&self) -> &[SchemaDocument] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Exact, case-sensitive lookup by canonical name.
    pub fn get(&self, name: &str) -> Result<&SchemaDocument, QueryError> {
        if name.trim().is_empty() {
            return Err(QueryError::invalid_input("schema name must not be empty"));
        }
        self.by_name
            .get(name)
            .map(|&i| &self.docs[i])
            .ok_or_else(|| {
                let known: Vec<&str> = self.docs.iter().map(|d| d.name.as_str()).collect();
                QueryError::not_found(format!(
                    "schema '{}' not found (available: {})",
                    name,
                    known.join(", ")
                ))
            })
    }

    /// Resolve a cross-schema `$ref` string to the referenced document.
    /// Internal fragment refs (`#/...`) are not handled here.
    pub fn resolve_ref(&self, reference: &str) -> Option<&SchemaDocument> {
        let name = ref_schema_name(reference)?;
        self.by_name.get(name).map(|&i| &self.docs[i])
    }

    /// Check every reference in every document: unknown schema targets,
    /// dangling fragment pointers, and reference cycles are all fatal.
    /// Nodes in the walk are `(document, pointer)` pairs, so a cycle among
    /// fragment targets inside one document is caught here too, not at
    /// validation time.
    pub fn verify_refs(&self) -> Result<(), LoadError> {
        let mut state: HashMap<(usize, String), VisitState> = HashMap::new();
        for doc in 0..self.docs.len() {
            self.visit(doc, "", &mut state)?;
        }
        Ok(())
    }

    /// Depth-first walk from one ref node; a back edge is a cycle. Edges
    /// are the `$ref` strings anywhere under the node's pointer.
    fn visit(
        &self,
        doc: usize,
        pointer: &str,
        state: &mut HashMap<(usize, String), VisitState>,
    ) -> Result<(), LoadError> {
        let key = (doc, pointer.to_string());
        match state.get(&key) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                return Err(LoadError::ReferenceCycle {
                    schema: node_label(&self.docs[doc].name, pointer),
                });
            }
            None => {}
        }
        state.insert(key.clone(), VisitState::InProgress);

        let mut refs = Vec::new();
        if let Some(node) = self.docs[doc].raw.pointer(pointer) {
            collect_refs(node, &mut refs);
        }
        for reference in refs {
            let (file, fragment) = split_ref(reference);
            let target = if file.is_empty() {
                doc
            } else {
                let name = ref_schema_name(reference).ok_or_else(|| {
                    LoadError::UnresolvedRef {
                        schema: self.docs[doc].name.clone(),
                        reference: reference.to_string(),
                    }
                })?;
                let Some(&idx) = self.by_name.get(name) else {
                    return Err(LoadError::UnresolvedRef {
                        schema: self.docs[doc].name.clone(),
                        reference: reference.to_string(),
                    });
                };
                idx
            };
            let target_pointer = fragment.unwrap_or("");
            if self.docs[target].raw.pointer(target_pointer).is_none() {
                return Err(LoadError::UnresolvedRef {
                    schema: self.docs[doc].name.clone(),
                    reference: reference.to_string(),
                });
            }
            self.visit(target, target_pointer, state)?;
        }

        state.insert(key, VisitState::Done);
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

fn node_label(name: &str, pointer: &str) -> String {
    if pointer.is_empty() {
        name.to_string()
    } else {
        format!("{name}#{pointer}")
    }
}

/// Canonical schema name for a cross-schema `$ref`, or `None` when the
/// reference stays inside the current document. Accepts absolute CDES
/// URIs, relative paths, and bare file names, with or without fragments.
pub fn ref_schema_name(reference: &str) -> Option<&str> {
    let (file, _) = split_ref(reference);
    let last = file.rsplit('/').next()?;
    let stem = last.strip_suffix(".json").unwrap_or(last);
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Split a `$ref` into its file part and JSON Pointer fragment.
/// `"coa.json#/$defs/x"` becomes `("coa.json", Some("/$defs/x"))`;
/// `"#/$defs/x"` becomes `("", Some("/$defs/x"))`.
pub fn split_ref(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((file, fragment)) => (file, Some(fragment)),
        None => (reference, None),
    }
}

fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                out.push(reference);
            }
            for v in map.values() {
                collect_refs(v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(name: &str, raw: Value) -> SchemaDocument {
        SchemaDocument {
            name: name.to_string(),
            title: name.to_string(),
            description: String::new(),
            schema_id: format!("https://schemas.terprint.com/cdes/v1/{name}.json"),
            required_fields: Vec::new(),
            raw,
        }
    }

    #[test]
    fn ref_names_normalize_across_forms() {
        assert_eq!(
            ref_schema_name("https://schemas.terprint.com/cdes/v1/terpene-profile.json"),
            Some("terpene-profile")
        );
        assert_eq!(
            ref_schema_name("terpene-profile.json#/$defs/entry"),
            Some("terpene-profile")
        );
        assert_eq!(ref_schema_name("./coa.json"), Some("coa"));
        assert_eq!(ref_schema_name("#/$defs/percentValue"), None);
    }

    #[test]
    fn get_is_exact_and_reports_missing() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc("strain", json!({"type": "object"})));

        assert!(registry.get("strain").is_ok());
        let err = registry.get("Strain").unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert!(err.to_string().contains("strain"));
        assert_eq!(registry.get("").unwrap_err().error_kind(), "invalid_input");
    }

    #[test]
    fn unresolved_ref_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "strain",
            json!({"properties": {"profile": {"$ref": "missing-schema.json"}}}),
        ));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedRef { .. }));
    }

    #[test]
    fn reference_cycle_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc("a", json!({"properties": {"b": {"$ref": "b.json"}}})));
        registry.insert(doc("b", json!({"properties": {"a": {"$ref": "a.json"}}})));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::ReferenceCycle { .. }));
    }

    #[test]
    fn self_referential_fragment_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "strain",
            json!({
                "properties": {"profile": {"$ref": "#/$defs/a"}},
                "$defs": {"a": {"$ref": "#/$defs/a"}},
            }),
        ));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::ReferenceCycle { .. }));
        assert!(err.to_string().contains("$defs/a"));
    }

    #[test]
    fn mutual_fragment_cycle_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "coa",
            json!({
                "$defs": {
                    "a": {"$ref": "#/$defs/b"},
                    "b": {"$ref": "#/$defs/a"},
                },
            }),
        ));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::ReferenceCycle { .. }));
    }

    #[test]
    fn cross_document_fragment_cycle_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "coa",
            json!({"$defs": {"thc": {"$ref": "strain.json#/$defs/thc"}}}),
        ));
        registry.insert(doc(
            "strain",
            json!({
                "properties": {"coa": {"$ref": "coa.json#/$defs/thc"}},
                "$defs": {"thc": {"$ref": "coa.json#/$defs/thc"}},
            }),
        ));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::ReferenceCycle { .. }));
    }

    #[test]
    fn internal_fragment_refs_resolve_within_the_document() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "terpene-profile",
            json!({
                "properties": {"myrcene": {"$ref": "#/$defs/percentValue"}},
                "$defs": {"percentValue": {"type": "number"}},
            }),
        ));
        assert!(registry.verify_refs().is_ok());
    }

    #[test]
    fn dangling_fragment_is_fatal() {
        let mut registry = SchemaRegistry::new();
        registry.insert(doc(
            "coa",
            json!({"properties": {"thc": {"$ref": "#/$defs/missing"}}}),
        ));

        let err = registry.verify_refs().unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedRef { .. }));
    }
}
