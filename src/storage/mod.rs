//! Model persistence
//!
//! Remote methods talk to storage through [`ModelStore`], which works on
//! JSON documents grouped by model name. Every document carries its `id` as
//! a UUID string.

pub mod in_memory;
pub mod migrate;

use crate::core::query::{Filter, Where};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

pub use in_memory::InMemoryModelStore;
pub use migrate::{BUILT_IN_MODELS, automigrate, autoupdate};

/// Document storage for model instances
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Insert a document, assigning an id unless it carries a valid one
    async fn create(&self, model: &str, data: Map<String, Value>) -> Result<Value>;

    async fn get(&self, model: &str, id: &Uuid) -> Result<Option<Value>>;

    async fn find(&self, model: &str, filter: &Filter) -> Result<Vec<Value>>;

    async fn count(&self, model: &str, where_clause: Option<&Where>) -> Result<usize>;

    /// Merge `changes` into a document; `None` when it does not exist
    async fn update(&self, model: &str, id: &Uuid, changes: Map<String, Value>)
    -> Result<Option<Value>>;

    /// Replace a document's fields, keeping its id; `None` when it does not exist
    async fn replace(&self, model: &str, id: &Uuid, data: Map<String, Value>)
    -> Result<Option<Value>>;

    /// Returns whether a document was removed
    async fn delete(&self, model: &str, id: &Uuid) -> Result<bool>;

    /// Merge `changes` into every matching document, returning how many changed
    async fn update_where(
        &self,
        model: &str,
        where_clause: Option<&Where>,
        changes: Map<String, Value>,
    ) -> Result<usize>;

    /// Remove every matching document, returning how many were removed
    async fn delete_where(&self, model: &str, where_clause: Option<&Where>) -> Result<usize>;

    /// Drop and recreate the model's collection
    async fn automigrate(&self, model: &str) -> Result<()>;

    /// Ensure the model's collection exists, keeping its data
    async fn autoupdate(&self, model: &str) -> Result<()>;
}

/// Id of a stored document
pub fn document_id(document: &Value) -> Option<Uuid> {
    document
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
}
