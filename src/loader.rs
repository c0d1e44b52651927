//! Document loader: reads the on-disk dataset once at startup and builds
//! the immutable [`Engine`].
//!
//! Layout: one schema document per file under `data.schema_dir`, one
//! reference library per file under each `data.reference.*` directory.
//! The directory a reference file lives in decides the category of every
//! record inside it. Any malformed file, duplicate identifier, or
//! unresolvable schema reference aborts the load.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::LoadError;
use crate::models::{Category, ReferenceEntity, ReferenceSetMeta, SchemaDocument};
use crate::registry::SchemaRegistry;
use crate::store::ReferenceStore;

/// Read every schema and reference document and assemble the engine.
/// The first problem encountered aborts the whole load.
pub fn load(config: &Config) -> Result<Engine, LoadError> {
    let mut hasher = Sha256::new();

    let registry = load_schemas(config, &mut hasher)?;
    let (store, sets) = load_references(config, &mut hasher)?;
    registry.verify_refs()?;

    let fingerprint = format!("{:x}", hasher.finalize());
    Ok(Engine::new(
        registry,
        store,
        sets,
        config.search.clone(),
        fingerprint,
    ))
}

fn load_schemas(config: &Config, hasher: &mut Sha256) -> Result<SchemaRegistry, LoadError> {
    let dir = &config.data.schema_dir;
    let globs = build_globset(&config.data.schema_globs, dir)?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !globs.is_match(file_name) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((stem.to_string(), path.clone()));
    }
    // Canonical load order is the sorted schema name.
    files.sort();

    if files.is_empty() {
        return Err(LoadError::EmptySchemaDir { path: dir.clone() });
    }

    let mut registry = SchemaRegistry::new();
    for (name, path) in files {
        let (raw, text) = read_json(&path)?;
        hasher.update(name.as_bytes());
        hasher.update(text.as_bytes());

        if !raw.is_object() {
            return Err(LoadError::Malformed {
                path,
                reason: "schema document must be a JSON object".to_string(),
            });
        }
        if registry.contains(&name) {
            return Err(LoadError::DuplicateSchema { name, path });
        }

        let title = str_field(&raw, "title").unwrap_or_else(|| name.clone());
        let description = str_field(&raw, "description").unwrap_or_default();
        let schema_id = str_field(&raw, "$id").unwrap_or_default();
        let required_fields = raw
            .get("required")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        registry.insert(SchemaDocument {
            name,
            title,
            description,
            schema_id,
            required_fields,
            raw,
        });
    }

    Ok(registry)
}

fn load_references(
    config: &Config,
    hasher: &mut Sha256,
) -> Result<(ReferenceStore, Vec<ReferenceSetMeta>), LoadError> {
    let mut store = ReferenceStore::new();
    let mut sets = Vec::new();

    for (category, dir) in config.data.reference.iter() {
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| walk_error(dir, e))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
            {
                files.push(entry.into_path());
            }
        }
        files.sort();

        for path in files {
            let (raw, text) = read_json(&path)?;
            hasher.update(text.as_bytes());

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("reference")
                .to_string();
            let records = records_array(&raw, category, &path)?;

            sets.push(ReferenceSetMeta {
                name,
                category,
                description: str_field(&raw, "description").unwrap_or_default(),
                version: str_field(&raw, "version").unwrap_or_default(),
                license: str_field(&raw, "license").unwrap_or_default(),
                records: records.len(),
            });

            for (i, record) in records.iter().enumerate() {
                let entity = build_entity(category, record, i, &path)?;
                if store.contains_id(category, &entity.id) {
                    return Err(LoadError::DuplicateEntity {
                        category: category.to_string(),
                        id: entity.id,
                        path,
                    });
                }
                store.insert(entity);
            }
        }
    }

    Ok((store, sets))
}

/// The record array for a category, under its plural key
/// (`terpenes`/`cannabinoids`/`colors`) or as the document root.
fn records_array<'a>(
    raw: &'a Value,
    category: Category,
    path: &Path,
) -> Result<&'a Vec<Value>, LoadError> {
    let key = category.plural();
    if let Some(Value::Array(records)) = raw.get(key) {
        return Ok(records);
    }
    if let Value::Array(records) = raw {
        return Ok(records);
    }
    Err(LoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("expected a '{key}' array of records"),
    })
}

fn build_entity(
    category: Category,
    record: &Value,
    index: usize,
    path: &Path,
) -> Result<ReferenceEntity, LoadError> {
    let Some(fields) = record.as_object() else {
        return Err(LoadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("record {index} is not a JSON object"),
        });
    };

    let (id, display_name, aliases) = match category {
        Category::Terpene | Category::Cannabinoid => {
            let id = require_str(fields, "id", index, path)?.to_lowercase();
            let display_name = fields
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(&id)
                .to_string();
            let mut aliases = Vec::new();
            if let Some(full) = fields.get("fullName").and_then(Value::as_str) {
                aliases.push(full.to_string());
            }
            for key in ["aka", "aliases"] {
                if let Some(Value::Array(names)) = fields.get(key) {
                    aliases.extend(names.iter().filter_map(Value::as_str).map(String::from));
                }
            }
            (id, display_name, aliases)
        }
        Category::Color => {
            // Color records key on the terpene name; the prefixed id form
            // is registered as an alias so terpene ids resolve too.
            let key = require_str(fields, "terpene", index, path)?;
            let id = key.to_lowercase();
            let aliases = vec![format!("terpene:{id}")];
            (id, key.to_string(), aliases)
        }
    };

    Ok(ReferenceEntity {
        id,
        display_name,
        category,
        aliases,
        fields: fields.clone(),
    })
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(String::from)
}

fn require_str<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
    index: usize,
    path: &Path,
) -> Result<&'a str, LoadError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("record {index} is missing required field '{key}'"),
        })
}

fn read_json(path: &Path) -> Result<(Value, String), LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((raw, text))
}

fn build_globset(patterns: &[String], dir: &Path) -> Result<GlobSet, LoadError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| LoadError::Malformed {
            path: dir.to_path_buf(),
            reason: format!("invalid schema glob '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| LoadError::Malformed {
        path: dir.to_path_buf(),
        reason: format!("invalid schema globs: {e}"),
    })
}

fn walk_error(dir: &Path, e: walkdir::Error) -> LoadError {
    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
    LoadError::Io { path, source }
}
