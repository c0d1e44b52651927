//! Search index: token-level inverted index over reference-entity text,
//! built once after load.
//!
//! Postings map token → entity ordinal → matched field names; the index
//! never copies entity records, only their identifiers. Scoring weights
//! come from `[search]` config.

use std::collections::{BTreeSet, HashMap};

use crate::config::SearchConfig;
use crate::models::{Category, ReferenceEntity, SearchHit};

/// Field names treated as identifiers for scoring. Matches in these
/// weigh `name_weight`; everything else weighs `text_weight`.
const NAME_FIELDS: [&str; 4] = ["id", "name", "fullName", "terpene"];

#[derive(Debug)]
pub struct SearchIndex {
    config: SearchConfig,
    postings: HashMap<String, HashMap<usize, BTreeSet<String>>>,
    entries: Vec<IndexedEntity>,
}

/// Identifier-level view of one indexed entity.
#[derive(Debug)]
struct IndexedEntity {
    id: String,
    category: Category,
    display_name_lower: String,
}

impl SearchIndex {
    /// Build the index over every entity, all categories included.
    pub fn build(entities: &[ReferenceEntity], config: SearchConfig) -> Self {
        let mut postings: HashMap<String, HashMap<usize, BTreeSet<String>>> = HashMap::new();
        let mut entries = Vec::with_capacity(entities.len());

        for (ordinal, entity) in entities.iter().enumerate() {
            for (field, text) in entity.text_fields() {
                for token in tokenize(&text) {
                    postings
                        .entry(token)
                        .or_default()
                        .entry(ordinal)
                        .or_default()
                        .insert(field.clone());
                }
            }
            // Aliases are lookup keys, not record fields; index them
            // under the name weight.
            for alias in &entity.aliases {
                for token in tokenize(alias) {
                    postings
                        .entry(token)
                        .or_default()
                        .entry(ordinal)
                        .or_default()
                        .insert("name".to_string());
                }
            }
            entries.push(IndexedEntity {
                id: entity.id.clone(),
                category: entity.category,
                display_name_lower: entity.display_name.to_lowercase(),
            });
        }

        SearchIndex {
            config,
            postings,
            entries,
        }
    }

    /// Ranked search across indexed entities. Entities sharing no token
    /// with the query are excluded; an empty query yields no hits.
    pub fn search(&self, query: &str, category: Option<Category>) -> Vec<SearchHit> {
        let trimmed = query.trim();
        let tokens = tokenize(trimmed);
        if tokens.is_empty() {
            return Vec::new();
        }

        // entity ordinal -> (score, matched fields)
        let mut candidates: HashMap<usize, (f64, BTreeSet<String>)> = HashMap::new();
        let distinct: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
        for token in distinct {
            let Some(matches) = self.postings.get(token) else {
                continue;
            };
            for (&ordinal, fields) in matches {
                let weight = fields
                    .iter()
                    .map(|f| self.field_weight(f))
                    .fold(f64::MIN, f64::max);
                let entry = candidates
                    .entry(ordinal)
                    .or_insert_with(|| (0.0, BTreeSet::new()));
                entry.0 += weight;
                entry.1.extend(fields.iter().cloned());
            }
        }

        let query_lower = trimmed.to_lowercase();
        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|(ordinal, (mut score, fields))| {
                let entry = &self.entries[ordinal];
                if let Some(wanted) = category {
                    if entry.category != wanted {
                        return None;
                    }
                }
                if entry.display_name_lower.contains(&query_lower) {
                    score += self.config.exact_bonus;
                }
                Some(SearchHit {
                    entity_id: entry.id.clone(),
                    category: entry.category,
                    score,
                    matched_fields: fields.into_iter().collect(),
                })
            })
            .collect();

        // Sort: score desc, entity id asc (deterministic)
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.entity_id.cmp(&b.entity_id))
        });

        hits.truncate(self.config.max_hits);
        hits
    }

    fn field_weight(&self, field: &str) -> f64 {
        if NAME_FIELDS.contains(&field) {
            self.config.name_weight
        } else {
            self.config.text_weight
        }
    }
}

/// Case-fold and split on non-alphanumeric boundaries. `"Anti-Inflammatory"`
/// becomes `["anti", "inflammatory"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
