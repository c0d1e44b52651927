use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Category;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Directory holding the CDES schema documents.
    pub schema_dir: PathBuf,
    #[serde(default = "default_schema_globs")]
    pub schema_globs: Vec<String>,
    pub reference: ReferenceDirs,
}

/// One directory per reference category. The directory a record comes
/// from decides its category.
#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceDirs {
    pub terpene: PathBuf,
    pub cannabinoid: PathBuf,
    pub color: PathBuf,
}

impl ReferenceDirs {
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Path)> {
        [
            (Category::Terpene, self.terpene.as_path()),
            (Category::Cannabinoid, self.cannabinoid.as_path()),
            (Category::Color, self.color.as_path()),
        ]
        .into_iter()
    }
}

fn default_schema_globs() -> Vec<String> {
    vec!["*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Weight for hits in id, name, or alias fields.
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,
    /// Weight for hits in any other text field.
    #[serde(default = "default_text_weight")]
    pub text_weight: f64,
    /// Added when the whole query is a substring of the display name.
    #[serde(default = "default_exact_bonus")]
    pub exact_bonus: f64,
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            name_weight: default_name_weight(),
            text_weight: default_text_weight(),
            exact_bonus: default_exact_bonus(),
            max_hits: default_max_hits(),
        }
    }
}

fn default_name_weight() -> f64 {
    3.0
}
fn default_text_weight() -> f64 {
    1.0
}
fn default_exact_bonus() -> f64 {
    2.0
}
fn default_max_hits() -> usize {
    25
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate data
    if config.data.schema_globs.is_empty() {
        anyhow::bail!("data.schema_globs must not be empty");
    }

    // Validate search
    if config.search.max_hits < 1 {
        anyhow::bail!("search.max_hits must be >= 1");
    }

    if config.search.name_weight <= 0.0 || config.search.text_weight <= 0.0 {
        anyhow::bail!("search weights must be > 0");
    }

    if config.search.exact_bonus < 0.0 {
        anyhow::bail!("search.exact_bonus must be >= 0");
    }

    Ok(config)
}
