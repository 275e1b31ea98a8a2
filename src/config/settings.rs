//! Per-environment server settings
//!
//! Settings start from the defaults of the selected [`Environment`]
//! (`JOBTRACK_ENV`), then a YAML override file (`JOBTRACK_SETTINGS`) and
//! finally `JOBTRACK_PORT` are applied on top.

use crate::core::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    /// Environment named by `JOBTRACK_ENV`, development when unset or unknown
    pub fn from_env() -> Self {
        match std::env::var("JOBTRACK_ENV") {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                tracing::warn!("unknown JOBTRACK_ENV '{}', using development", value);
                Environment::Development
            }),
            Err(_) => Environment::Development,
        }
    }
}

/// How errors are rendered and logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHandlerSettings {
    /// Include internal messages in 5xx responses
    pub debug: bool,

    /// Log 5xx responses
    pub log: bool,
}

/// Schema migration run at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    Automigrate,
    Autoupdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    /// Prefix of every model route
    pub rest_api_root: String,

    pub error_handler: ErrorHandlerSettings,

    /// Lifetime of issued access tokens
    pub token_ttl_seconds: i64,

    /// Buffered change events per stream before a slow subscriber lags
    pub change_stream_capacity: usize,

    pub migrate: Option<MigrationMode>,
}

impl ServerSettings {
    pub fn for_environment(environment: Environment) -> Self {
        let (port, log) = match environment {
            Environment::Development => (3001, true),
            Environment::Test => (3002, false),
            Environment::Production => (3000, true),
        };

        Self {
            environment,
            host: "0.0.0.0".to_string(),
            port,
            rest_api_root: "/api".to_string(),
            error_handler: ErrorHandlerSettings { debug: false, log },
            token_ttl_seconds: crate::identity::DEFAULT_TTL_SECONDS,
            change_stream_capacity: 1024,
            migrate: None,
        }
    }

    /// Settings for the environment from `JOBTRACK_ENV`, with file and port overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::for_environment(Environment::from_env());

        if let Ok(path) = std::env::var("JOBTRACK_SETTINGS") {
            settings.apply(SettingsOverrides::from_yaml_file(&path)?);
        }

        if let Ok(port) = std::env::var("JOBTRACK_PORT") {
            settings.port = port.parse().map_err(|_| ConfigError::ParseError {
                file: None,
                message: format!("JOBTRACK_PORT '{}' is not a port number", port),
            })?;
        }

        Ok(settings)
    }

    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(root) = overrides.rest_api_root {
            self.rest_api_root = root;
        }
        if let Some(debug) = overrides.debug {
            self.error_handler.debug = debug;
        }
        if let Some(log) = overrides.log_errors {
            self.error_handler.log = log;
        }
        if let Some(ttl) = overrides.token_ttl_seconds {
            self.token_ttl_seconds = ttl;
        }
        if overrides.migrate.is_some() {
            self.migrate = overrides.migrate;
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// REST root without a trailing slash (`""` when mounted at `/`)
    pub fn rest_root(&self) -> &str {
        self.rest_api_root.trim_end_matches('/')
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

/// Partial settings read from a YAML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rest_api_root: Option<String>,
    pub debug: Option<bool>,
    pub log_errors: Option<bool>,
    pub token_ttl_seconds: Option<i64>,
    pub migrate: Option<MigrationMode>,
}

impl SettingsOverrides {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let overrides: Self = serde_yaml::from_str(yaml).map_err(ConfigError::from)?;
        Ok(overrides)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.display().to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }
}
