//! Reference store: owns every loaded [`ReferenceEntity`] and resolves
//! id and name lookups. Exact matching only; fuzzy retrieval lives in
//! the search index.

use std::collections::HashMap;

use crate::error::QueryError;
use crate::models::{Category, ReferenceEntity};

/// Load-ordered collection of reference entities with per-category
/// lookup maps. Built once by the loader; read-only afterwards.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    entities: Vec<ReferenceEntity>,
    by_category: HashMap<Category, Vec<usize>>,
    by_id: HashMap<(Category, String), usize>,
    /// Lowercased display names and aliases. First loaded entity wins
    /// on collisions.
    by_name: HashMap<(Category, String), usize>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_id(&self, category: Category, id: &str) -> bool {
        self.by_id.contains_key(&(category, id.to_string()))
    }

    pub fn insert(&mut self, entity: ReferenceEntity) {
        let idx = self.entities.len();
        let category = entity.category;
        self.by_id.insert((category, entity.id.clone()), idx);
        self.by_name
            .entry((category, entity.display_name.to_lowercase()))
            .or_insert(idx);
        for alias in &entity.aliases {
            self.by_name
                .entry((category, alias.to_lowercase()))
                .or_insert(idx);
        }
        self.by_category.entry(category).or_default().push(idx);
        self.entities.push(entity);
    }

    /// Resolve by exact id first, then case-insensitive name or alias.
    pub fn get(&self, category: Category, id_or_name: &str) -> Result<&ReferenceEntity, QueryError> {
        let key = id_or_name.trim();
        if key.is_empty() {
            return Err(QueryError::invalid_input(format!(
                "{category} lookup key must not be empty"
            )));
        }
        if let Some(&idx) = self.by_id.get(&(category, key.to_string())) {
            return Ok(&self.entities[idx]);
        }
        if let Some(&idx) = self.by_name.get(&(category, key.to_lowercase())) {
            return Ok(&self.entities[idx]);
        }
        let available: Vec<&str> = self
            .list(category)
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        Err(QueryError::not_found(format!(
            "{} '{}' not found (available: {})",
            category,
            key,
            available.join(", ")
        )))
    }

    /// Entities of one category in load order.
    pub fn list(&self, category: Category) -> Vec<&ReferenceEntity> {
        self.by_category
            .get(&category)
            .map(|indices| indices.iter().map(|&i| &self.entities[i]).collect())
            .unwrap_or_default()
    }

    /// Every entity in load order, across categories.
    pub fn all(&self) -> &[ReferenceEntity] {
        &self.entities
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category.get(&category).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn entity(
        category: Category,
        id: &str,
        name: &str,
        aliases: &[&str],
        fields: Value,
    ) -> ReferenceEntity {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object")
        };
        ReferenceEntity {
            id: id.to_string(),
            display_name: name.to_string(),
            category,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            fields,
        }
    }

    fn test_store() -> ReferenceStore {
        let mut store = ReferenceStore::new();
        store.insert(entity(
            Category::Terpene,
            "terpene:myrcene",
            "Myrcene",
            &[],
            json!({"id": "terpene:myrcene", "name": "Myrcene"}),
        ));
        store.insert(entity(
            Category::Terpene,
            "terpene:limonene",
            "Limonene",
            &[],
            json!({"id": "terpene:limonene", "name": "Limonene"}),
        ));
        store.insert(entity(
            Category::Cannabinoid,
            "cannabinoid:thc",
            "THC",
            &["Delta-9-Tetrahydrocannabinol"],
            json!({"id": "cannabinoid:thc", "name": "THC"}),
        ));
        store.insert(entity(
            Category::Color,
            "myrcene",
            "myrcene",
            &["terpene:myrcene"],
            json!({"terpene": "myrcene", "hex": "#7A6F4E"}),
        ));
        store
    }

    #[test]
    fn id_match_comes_before_name_match() {
        let store = test_store();
        let hit = store.get(Category::Terpene, "terpene:myrcene").unwrap();
        assert_eq!(hit.display_name, "Myrcene");
        // Names resolve case-insensitively.
        let hit = store.get(Category::Terpene, "MYRCENE").unwrap();
        assert_eq!(hit.id, "terpene:myrcene");
    }

    #[test]
    fn aliases_resolve_like_names() {
        let store = test_store();
        let hit = store
            .get(Category::Cannabinoid, "delta-9-tetrahydrocannabinol")
            .unwrap();
        assert_eq!(hit.id, "cannabinoid:thc");
        // Color records answer to both the bare key and the terpene id.
        assert!(store.get(Category::Color, "terpene:myrcene").is_ok());
        assert!(store.get(Category::Color, "Myrcene").is_ok());
    }

    #[test]
    fn unknown_names_list_what_exists() {
        let store = test_store();
        let err = store.get(Category::Terpene, "pinene").unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert!(err.to_string().contains("Myrcene"));
        assert!(err.to_string().contains("Limonene"));
    }

    #[test]
    fn empty_key_is_invalid_input() {
        let store = test_store();
        let err = store.get(Category::Terpene, "  ").unwrap_err();
        assert_eq!(err.error_kind(), "invalid_input");
    }

    #[test]
    fn listing_keeps_load_order_per_category() {
        let store = test_store();
        let names: Vec<&str> = store
            .list(Category::Terpene)
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Myrcene", "Limonene"]);
        assert_eq!(store.count(Category::Cannabinoid), 1);
        assert_eq!(store.count(Category::Color), 1);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn first_loaded_entity_wins_name_collisions() {
        let mut store = test_store();
        store.insert(entity(
            Category::Terpene,
            "terpene:myrcene-beta",
            "Myrcene",
            &[],
            json!({"id": "terpene:myrcene-beta"}),
        ));
        let hit = store.get(Category::Terpene, "myrcene").unwrap();
        assert_eq!(hit.id, "terpene:myrcene");
        // The newcomer stays reachable by id.
        assert!(store.get(Category::Terpene, "terpene:myrcene-beta").is_ok());
    }
}
