//! Configuration loading and management

use crate::specification::criterion::Criterion;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Resource name the entity type reports (e.g., "issues")
    pub name: String,

    /// Table used when rendering SQL; defaults to the resource name
    #[serde(default)]
    pub table: Option<String>,

    /// Filters applied to every query unless it ignores query filters
    #[serde(default)]
    pub global_filters: Vec<Criterion>,
}

/// Settings for the repository result cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached results
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,

    /// Time to live of a cached result, in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_max_capacity() -> u64 {
    1_000
}

fn default_ttl_seconds() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// Complete configuration for the query engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-entity settings
    #[serde(default)]
    pub entities: Vec<EntityConfig>,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_capacity == 0 {
            return Err(anyhow!("cache.max_capacity must be greater than zero"));
        }
        for (idx, entity) in self.entities.iter().enumerate() {
            if entity.name.trim().is_empty() {
                return Err(anyhow!("entities[{}].name must not be empty", idx));
            }
            if self.entities[..idx].iter().any(|e| e.name == entity.name) {
                return Err(anyhow!("entity '{}' is configured twice", entity.name));
            }
        }
        Ok(())
    }

    /// Find the settings of an entity type
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Table name for an entity type
    pub fn table_for(&self, name: &str) -> String {
        self.entity(name)
            .and_then(|e| e.table.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Global filters for an entity type
    pub fn global_filters_for(&self, name: &str) -> Vec<Criterion> {
        self.entity(name)
            .map(|e| e.global_filters.clone())
            .unwrap_or_default()
    }
}
