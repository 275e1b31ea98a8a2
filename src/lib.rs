//! # jobtrack-api
//!
//! REST API for tracking job searches, jobs, offers and interactions.
//!
//! Each model generates the full set of LoopBack-style remote methods (CRUD,
//! change streams and relation accessors). At boot every model is run
//! through the endpoint allow-list enforcer: everything not named in its
//! `enabled_methods` is disabled and gets no route.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobtrack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     AppBuilder::new()
//!         .with_config(ApiConfig::default_config()?)
//!         .with_settings(ServerSettings::load()?)
//!         .serve()
//!         .await
//! }
//! ```
//!
//! ## Allow-lists
//!
//! ```yaml
//! models:
//!   interaction:
//!     enabled_methods:
//!       - create
//!       - findById
//!       - replaceById$post
//!       - prototype.__get__job
//! ```

pub mod config;
pub mod core;
pub mod identity;
pub mod remote;
pub mod server;
pub mod storage;

/// Common imports
pub mod prelude {
    pub use crate::config::{
        AllowListEntry, AllowLists, ApiConfig, Environment, ModelConfig, ServerSettings,
    };
    pub use crate::core::{
        ApiError, ApiResult, AuthContext, BaseMethod, ModelHandle, RemoteMethodHost,
        disable_all_methods_with_exceptions,
    };
    pub use crate::identity::{RoleRegistry, TokenService};
    pub use crate::server::{AppBuilder, AppHost, RestExposure};
    pub use crate::storage::{InMemoryModelStore, ModelStore};
}
