//! Configuration loading and management
//!
//! Two layers: [`ApiConfig`] describes the models (relations, ACLs,
//! validations and the allow-list of remote methods each one exposes), and
//! [`settings::ServerSettings`] holds the per-environment server options.

pub mod settings;

use crate::core::auth::AclRule;
use crate::core::error::ConfigError;
use crate::core::pluralize::pluralize;
use crate::core::relation::{RelationDefinition, RelationKind};
use crate::core::validation::ValidationRule;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub use settings::{Environment, ErrorHandlerSettings, MigrationMode, ServerSettings};

/// Model definitions shipped with the server
const DEFAULT_MODELS: &str = include_str!("../../config/models.yaml");

/// Data source backed by process memory; never migrated
pub const MEMORY_DATA_SOURCE: &str = "db";

/// Built-in base a model extends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelBase {
    #[default]
    PersistedModel,
    User,
}

fn default_public() -> bool {
    true
}

fn default_data_source() -> String {
    MEMORY_DATA_SOURCE.to_string()
}

/// Configuration of one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Collection path segment, defaults to the pluralized model name
    #[serde(default)]
    pub plural: Option<String>,

    #[serde(default)]
    pub base: ModelBase,

    /// Non-public models get no routes
    #[serde(default = "default_public")]
    pub public: bool,

    #[serde(default = "default_data_source", alias = "dataSource")]
    pub data_source: String,

    /// `identity` (the instance is the user) or the name of the owner field
    #[serde(default)]
    pub owner: Option<String>,

    /// Fields never returned in responses
    #[serde(default)]
    pub hidden: Vec<String>,

    /// Absent and empty both mean "no relations"
    #[serde(default)]
    pub relations: Option<Vec<RelationDefinition>>,

    #[serde(default)]
    pub validations: Vec<ValidationRule>,

    #[serde(default)]
    pub acls: Vec<AclRule>,

    /// Remote methods left invokable; everything else is disabled at boot
    #[serde(default, alias = "enabledMethods")]
    pub enabled_methods: Vec<String>,
}

impl ModelConfig {
    pub fn plural_for(&self, name: &str) -> String {
        self.plural.clone().unwrap_or_else(|| pluralize(name))
    }

    pub fn relations(&self) -> &[RelationDefinition] {
        self.relations.as_deref().unwrap_or_default()
    }
}

/// Complete model configuration, keyed by model name in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}

impl ApiConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(ConfigError::from)?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// The job-tracking models: users, interactions, jobs, offers, searches
    pub fn default_config() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_MODELS)
    }

    /// Merge several configurations; a later definition of a model replaces an earlier one
    pub fn merge(configs: Vec<ApiConfig>) -> Self {
        let mut merged = ApiConfig::default();
        for config in configs {
            for (name, model) in config.models {
                merged.models.insert(name, model);
            }
        }
        merged
    }

    /// Replace the allow-lists of the listed models
    pub fn apply_allow_lists(&mut self, allow_lists: AllowLists) -> Result<(), ConfigError> {
        for (name, entry) in allow_lists.0 {
            let model = self
                .models
                .get_mut(&name)
                .ok_or_else(|| ConfigError::UnknownModel { model: name.clone() })?;
            model.enabled_methods = entry.into_methods();
        }
        Ok(())
    }

    /// Check relation targets and collection paths
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut plurals = HashSet::new();

        for (name, model) in &self.models {
            if model.public && !plurals.insert(model.plural_for(name)) {
                return Err(ConfigError::DuplicatePlural {
                    plural: model.plural_for(name),
                });
            }

            for relation in model.relations() {
                let mut targets = vec![&relation.model];
                if relation.kind == RelationKind::HasManyThrough {
                    match &relation.through {
                        Some(through) => targets.push(through),
                        None => {
                            return Err(ConfigError::UnknownRelationTarget {
                                model: name.clone(),
                                relation: relation.name.clone(),
                                target: "<through>".to_string(),
                            });
                        }
                    }
                }

                if let Some(missing) = targets.into_iter().find(|t| !self.models.contains_key(*t)) {
                    return Err(ConfigError::UnknownRelationTarget {
                        model: name.clone(),
                        relation: relation.name.clone(),
                        target: missing.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Allow-list entry as found in configuration: a bare list or `{enabledMethods: [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowListEntry {
    Methods(Vec<String>),
    Model {
        #[serde(alias = "enabledMethods")]
        enabled_methods: Vec<String>,
    },
}

impl AllowListEntry {
    pub fn into_methods(self) -> Vec<String> {
        match self {
            AllowListEntry::Methods(methods) => methods,
            AllowListEntry::Model { enabled_methods } => enabled_methods,
        }
    }
}

/// Model name -> allow-list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowLists(pub IndexMap<String, AllowListEntry>);

impl AllowLists {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let lists: Self = serde_json::from_str(json).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        Ok(lists)
    }
}
