//! jobtrack-server
//!
//! Environment:
//! - `JOBTRACK_ENV`: development (default), test or production
//! - `JOBTRACK_SETTINGS`: YAML file overriding the environment's settings
//! - `JOBTRACK_PORT`: port to listen on
//! - `JOBTRACK_MODELS`: YAML model file replacing the bundled models
//! - `RUST_LOG`: log filter, `info` by default

use anyhow::Result;
use jobtrack::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = ServerSettings::load()?;
    let config = match std::env::var("JOBTRACK_MODELS") {
        Ok(path) => {
            tracing::info!("loading models from {}", path);
            ApiConfig::from_yaml_file(&path)?
        }
        Err(_) => ApiConfig::default_config()?,
    };

    AppBuilder::new()
        .with_config(config)
        .with_settings(settings)
        .serve()
        .await
}
