//! HTTP server assembly
//!
//! [`AppBuilder`] turns model configuration into an [`AppHost`], with each
//! model's allow-list enforced, and exposes the host over REST: one route
//! per enabled method binding, bound to the remote dispatcher.

pub mod builder;
pub mod exposure;
pub mod host;
pub mod registry;
pub mod router;

pub use builder::AppBuilder;
pub use exposure::RestExposure;
pub use host::AppHost;
pub use registry::ModelRegistry;
