//! Schema migration at boot
//!
//! `automigrate` recreates the collections of every model stored outside
//! the memory data source, dropping their data. `autoupdate` brings every
//! application model up to date while keeping data; the built-in identity
//! models are left alone.

use crate::config::MEMORY_DATA_SOURCE;
use crate::core::model::ModelHandle;
use crate::storage::ModelStore;
use anyhow::Result;

/// Models provided by the identity layer rather than the application
pub const BUILT_IN_MODELS: [&str; 5] = ["user", "accessToken", "acl", "roleMapping", "role"];

/// Recreate non-memory models; returns the migrated model names
pub async fn automigrate<'a>(
    store: &dyn ModelStore,
    models: impl IntoIterator<Item = &'a ModelHandle>,
) -> Result<Vec<String>> {
    let mut migrated = Vec::new();

    for model in models
        .into_iter()
        .filter(|m| m.data_source() != MEMORY_DATA_SOURCE)
    {
        store.automigrate(model.name()).await?;
        tracing::info!(model = model.name(), data_source = model.data_source(), "migrated");
        migrated.push(model.name().to_string());
    }

    Ok(migrated)
}

/// Update every application model; returns the updated model names
pub async fn autoupdate<'a>(
    store: &dyn ModelStore,
    models: impl IntoIterator<Item = &'a ModelHandle>,
) -> Result<Vec<String>> {
    let mut updated = Vec::new();

    for model in models
        .into_iter()
        .filter(|m| !BUILT_IN_MODELS.contains(&m.name()))
    {
        store.autoupdate(model.name()).await?;
        tracing::info!(model = model.name(), "updated");
        updated.push(model.name().to_string());
    }

    Ok(updated)
}
