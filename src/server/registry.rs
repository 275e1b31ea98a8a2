//! Registry of the models served by the application

use crate::config::ApiConfig;
use crate::core::model::ModelHandle;
use crate::core::surface::disable_all_methods_with_exceptions;
use indexmap::IndexMap;

/// Registered models keyed by name, in configuration order
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelHandle>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every configured model with its allow-list enforced
    pub fn from_config(config: &ApiConfig) -> Self {
        let mut registry = Self::new();

        for (name, model_config) in &config.models {
            let mut handle = ModelHandle::new(name, model_config.clone());
            let allowed = handle.enabled_methods().to_vec();
            disable_all_methods_with_exceptions(&mut handle, &allowed);
            registry.register(handle);
        }

        registry
    }

    /// Register a model, replacing any model of the same name
    pub fn register(&mut self, handle: ModelHandle) {
        self.models.insert(handle.name().to_string(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&ModelHandle> {
        self.models.get(name)
    }

    pub fn by_plural(&self, plural: &str) -> Option<&ModelHandle> {
        self.models.values().find(|model| model.plural() == plural)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelHandle> {
        self.models.values()
    }

    /// Models that get REST routes
    pub fn public(&self) -> impl Iterator<Item = &ModelHandle> {
        self.models.values().filter(|model| model.is_public())
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
