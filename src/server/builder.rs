//! AppBuilder for assembling and serving the REST API

use super::exposure::RestExposure;
use super::host::AppHost;
use super::registry::ModelRegistry;
use crate::config::{AllowLists, ApiConfig, MigrationMode, ServerSettings};
use crate::identity::{RoleRegistry, bootstrap_roles};
use crate::storage::{InMemoryModelStore, ModelStore, automigrate, autoupdate};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the application host and its router
///
/// # Example
///
/// ```ignore
/// let app = AppBuilder::new()
///     .with_config(ApiConfig::default_config()?)
///     .with_settings(ServerSettings::load()?)
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    configs: Vec<ApiConfig>,
    allow_lists: Vec<AllowLists>,
    settings: Option<ServerSettings>,
    store: Option<Arc<dyn ModelStore>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add model definitions; later configs replace models of the same name
    ///
    /// Without any config the bundled job-tracking models are served.
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Override the allow-lists of some models
    pub fn with_allow_lists(mut self, allow_lists: AllowLists) -> Self {
        self.allow_lists.push(allow_lists);
        self
    }

    pub fn with_settings(mut self, settings: ServerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Storage backend, in-memory by default
    pub fn with_store(mut self, store: impl ModelStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Register the models, run the boot script and the configured migration
    pub async fn build_host(self) -> Result<AppHost> {
        let mut config = if self.configs.is_empty() {
            ApiConfig::default_config()?
        } else {
            ApiConfig::merge(self.configs)
        };
        for allow_lists in self.allow_lists {
            config.apply_allow_lists(allow_lists)?;
        }
        config.validate()?;

        let settings = self.settings.unwrap_or_default();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryModelStore::new()));
        let models = ModelRegistry::from_config(&config);

        let roles = Arc::new(RoleRegistry::new());
        bootstrap_roles(&roles)?;

        match settings.migrate {
            Some(MigrationMode::Automigrate) => {
                automigrate(store.as_ref(), models.iter()).await?;
            }
            Some(MigrationMode::Autoupdate) => {
                autoupdate(store.as_ref(), models.iter()).await?;
            }
            None => {}
        }

        tracing::info!(
            environment = ?settings.environment,
            models = models.len(),
            "application host ready"
        );

        Ok(AppHost::from_builder_components(settings, models, store, roles))
    }

    /// Build the REST router
    pub async fn build(self) -> Result<Router> {
        let host = Arc::new(self.build_host().await?);
        RestExposure::build_router(host)
    }

    /// Serve on the settings' address with graceful shutdown
    ///
    /// Stops on SIGTERM or Ctrl+C.
    pub async fn serve(self) -> Result<()> {
        let host = Arc::new(self.build_host().await?);
        let addr = host.settings.address();
        let app = RestExposure::build_router(host)?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
