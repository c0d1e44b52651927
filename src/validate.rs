//! Validation engine: walks a schema document alongside a data object and
//! collects structured violations.
//!
//! The keyword subset is closed: `type` (including type arrays), `enum`,
//! `required`, `properties`, `items`, `additionalProperties: false`,
//! `oneOf`, and `$ref` (internal fragments and cross-schema). Fields the
//! schema does not mention are allowed unless the schema itself sets
//! `additionalProperties: false`.
//!
//! Validation failures are data: the walker never returns an error for a
//! rule failure, only for a malformed invocation (unknown schema name,
//! non-object input).

use serde_json::{json, Value};

use crate::error::QueryError;
use crate::models::{ValidationResult, Violation};
use crate::registry::{split_ref, SchemaRegistry};

/// Validate `data` against the named schema.
pub fn validate(
    registry: &SchemaRegistry,
    schema_name: &str,
    data: &Value,
) -> Result<ValidationResult, QueryError> {
    let doc = registry.get(schema_name)?;
    if !data.is_object() {
        return Err(QueryError::invalid_input(format!(
            "validation input must be a JSON object, got {}",
            json_type_name(data)
        )));
    }

    let mut walker = Walker {
        registry,
        violations: Vec::new(),
        active_refs: Vec::new(),
    };
    walker.check(&doc.raw, &doc.raw, data, "");
    Ok(ValidationResult::from_violations(walker.violations))
}

struct Walker<'r> {
    registry: &'r SchemaRegistry,
    violations: Vec<Violation>,
    /// Ref targets currently being expanded. A verified registry has no
    /// ref cycles, so this only bites when `verify_refs` was skipped.
    active_refs: Vec<&'r Value>,
}

impl<'r> Walker<'r> {
    /// Walk one schema node against one data node. `root` is the document
    /// the node came from, used to resolve internal fragment refs; it
    /// changes when the walk crosses into another schema.
    fn check(&mut self, schema: &'r Value, root: &'r Value, data: &Value, path: &str) {
        let Some(schema_obj) = schema.as_object() else {
            return;
        };

        // A $ref supersedes its siblings.
        if let Some(Value::String(reference)) = schema_obj.get("$ref") {
            if let Some((target, target_root)) = self.resolve(reference, root) {
                let revisit = self.active_refs.iter().any(|seen| std::ptr::eq(*seen, target));
                if !revisit {
                    self.active_refs.push(target);
                    self.check(target, target_root, data, path);
                    self.active_refs.pop();
                }
            }
            return;
        }

        if let Some(declared) = schema_obj.get("type") {
            if !matches_declared_type(declared, data) {
                self.violations.push(Violation::new(
                    display_path(path),
                    format!(
                        "expected {}, got {}",
                        describe_type(declared),
                        json_type_name(data)
                    ),
                    declared.clone(),
                    json!(json_type_name(data)),
                ));
                return;
            }
        }

        if let Some(Value::Array(allowed)) = schema_obj.get("enum") {
            if !allowed.contains(data) {
                self.violations.push(Violation::new(
                    display_path(path),
                    "value not in enumeration",
                    Value::Array(allowed.clone()),
                    data.clone(),
                ));
            }
        }

        if let Some(Value::Array(members)) = schema_obj.get("oneOf") {
            let matched = members
                .iter()
                .any(|member| self.matches(member, root, data));
            if !matched {
                let forms: Vec<Value> = members
                    .iter()
                    .map(|m| m.get("type").cloned().unwrap_or_else(|| json!("object")))
                    .collect();
                self.violations.push(Violation::new(
                    display_path(path),
                    "does not match any allowed form",
                    Value::Array(forms),
                    json!(json_type_name(data)),
                ));
            }
        }

        if let Some(data_obj) = data.as_object() {
            if let Some(Value::Array(required)) = schema_obj.get("required") {
                for field in required.iter().filter_map(Value::as_str) {
                    if !data_obj.contains_key(field) {
                        self.violations.push(Violation::new(
                            join_path(path, field),
                            "required field missing",
                            json!(field),
                            Value::Null,
                        ));
                    }
                }
            }

            let properties = schema_obj.get("properties").and_then(Value::as_object);
            if let Some(properties) = properties {
                for (key, subschema) in properties {
                    if let Some(value) = data_obj.get(key) {
                        self.check(subschema, root, value, &join_path(path, key));
                    }
                }
            }

            if schema_obj.get("additionalProperties") == Some(&Value::Bool(false)) {
                for (key, value) in data_obj {
                    let declared = properties.is_some_and(|p| p.contains_key(key));
                    if !declared {
                        self.violations.push(Violation::new(
                            join_path(path, key),
                            "additional field not allowed",
                            Value::Null,
                            json!(json_type_name(value)),
                        ));
                    }
                }
            }
        }

        if let Some(items) = data.as_array() {
            if let Some(item_schema) = schema_obj.get("items") {
                for (i, item) in items.iter().enumerate() {
                    self.check(item_schema, root, item, &join_path(path, &i.to_string()));
                }
            }
        }
    }

    /// True when `data` satisfies `schema` with no violations. Used for
    /// `oneOf` members, whose failures must stay silent.
    fn matches(&self, schema: &'r Value, root: &'r Value, data: &Value) -> bool {
        let mut scratch = Walker {
            registry: self.registry,
            violations: Vec::new(),
            active_refs: self.active_refs.clone(),
        };
        scratch.check(schema, root, data, "");
        scratch.violations.is_empty()
    }

    /// Resolve a `$ref` to its target node and the document that node
    /// lives in. Targets were verified at load; `None` only means the
    /// registry was built without verification, and the walk skips.
    fn resolve(&self, reference: &str, root: &'r Value) -> Option<(&'r Value, &'r Value)> {
        let (file, fragment) = split_ref(reference);
        let target_root = if file.is_empty() {
            root
        } else {
            &self.registry.resolve_ref(reference)?.raw
        };
        match fragment {
            Some(pointer) => target_root
                .pointer(pointer)
                .map(|node| (node, target_root)),
            None => Some((target_root, target_root)),
        }
    }
}

/// Observed JSON type for violation reporting. Numbers with a zero
/// fractional part report as `integer`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0) {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_declared_type(declared: &Value, data: &Value) -> bool {
    match declared {
        Value::String(name) => matches_type(name, data),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_type(name, data)),
        _ => true,
    }
}

fn matches_type(name: &str, data: &Value) -> bool {
    match name {
        "string" => data.is_string(),
        "number" => data.is_number(),
        "integer" => match data {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "boolean" => data.is_boolean(),
        "array" => data.is_array(),
        "object" => data.is_object(),
        "null" => data.is_null(),
        // Outside the closed vocabulary; do not reject on it.
        _ => true,
    }
}

fn describe_type(declared: &Value) -> String {
    match declared {
        Value::String(name) => name.clone(),
        Value::Array(names) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            format!("one of [{}]", names.join(", "))
        }
        other => other.to_string(),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}
