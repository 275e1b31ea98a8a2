//! In-memory model store for development and tests

use crate::core::error::StorageError;
use crate::core::query::{Filter, Where, matches_where};
use crate::storage::ModelStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Documents of one model in insertion order
type Collection = IndexMap<Uuid, Value>;

/// Store keeping every model's documents in process memory
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct InMemoryModelStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Collection>) -> T) -> Result<T> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(f(&collections))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> T) -> Result<T> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        Ok(f(&mut collections))
    }
}

fn with_id(mut data: Map<String, Value>, id: &Uuid) -> Value {
    data.insert("id".to_string(), Value::String(id.to_string()));
    Value::Object(data)
}

fn merge(document: &mut Value, changes: &Map<String, Value>) {
    if let Value::Object(fields) = document {
        for (key, value) in changes.iter().filter(|(key, _)| key.as_str() != "id") {
            fields.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn create(&self, model: &str, data: Map<String, Value>) -> Result<Value> {
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_else(Uuid::new_v4);

        let created = self.write(|collections| {
            let collection = collections.entry(model.to_string()).or_default();
            if collection.contains_key(&id) {
                return None;
            }
            let document = with_id(data, &id);
            collection.insert(id, document.clone());
            Some(document)
        })?;

        created.ok_or_else(|| {
            StorageError::OperationFailed {
                model: model.to_string(),
                operation: "create".to_string(),
                message: format!("id {} already exists", id),
            }
            .into()
        })
    }

    async fn get(&self, model: &str, id: &Uuid) -> Result<Option<Value>> {
        self.read(|collections| collections.get(model).and_then(|c| c.get(id)).cloned())
    }

    async fn find(&self, model: &str, filter: &Filter) -> Result<Vec<Value>> {
        let matching: Vec<Value> = self.read(|collections| {
            collections
                .get(model)
                .map(|c| c.values().filter(|doc| filter.matches(doc)).cloned().collect())
                .unwrap_or_default()
        })?;
        Ok(filter.paginate(matching))
    }

    async fn count(&self, model: &str, where_clause: Option<&Where>) -> Result<usize> {
        self.read(|collections| {
            collections.get(model).map_or(0, |c| {
                c.values()
                    .filter(|doc| matches_where(where_clause, doc))
                    .count()
            })
        })
    }

    async fn update(
        &self,
        model: &str,
        id: &Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>> {
        self.write(|collections| {
            let document = collections.get_mut(model)?.get_mut(id)?;
            merge(document, &changes);
            Some(document.clone())
        })
    }

    async fn replace(
        &self,
        model: &str,
        id: &Uuid,
        data: Map<String, Value>,
    ) -> Result<Option<Value>> {
        self.write(|collections| {
            let document = collections.get_mut(model)?.get_mut(id)?;
            *document = with_id(data, id);
            Some(document.clone())
        })
    }

    async fn delete(&self, model: &str, id: &Uuid) -> Result<bool> {
        self.write(|collections| {
            collections
                .get_mut(model)
                .is_some_and(|c| c.shift_remove(id).is_some())
        })
    }

    async fn update_where(
        &self,
        model: &str,
        where_clause: Option<&Where>,
        changes: Map<String, Value>,
    ) -> Result<usize> {
        self.write(|collections| {
            let Some(collection) = collections.get_mut(model) else {
                return 0;
            };
            let mut updated = 0;
            for document in collection
                .values_mut()
                .filter(|doc| matches_where(where_clause, doc))
            {
                merge(document, &changes);
                updated += 1;
            }
            updated
        })
    }

    async fn delete_where(&self, model: &str, where_clause: Option<&Where>) -> Result<usize> {
        self.write(|collections| {
            let Some(collection) = collections.get_mut(model) else {
                return 0;
            };
            let before = collection.len();
            collection.retain(|_, doc| !matches_where(where_clause, doc));
            before - collection.len()
        })
    }

    async fn automigrate(&self, model: &str) -> Result<()> {
        self.write(|collections| {
            collections.insert(model.to_string(), Collection::new());
        })
    }

    async fn autoupdate(&self, model: &str) -> Result<()> {
        self.write(|collections| {
            collections.entry(model.to_string()).or_default();
        })
    }
}
