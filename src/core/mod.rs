//! Core types shared by configuration, storage and the server

pub mod auth;
pub mod error;
pub mod events;
pub mod method;
pub mod model;
pub mod pluralize;
pub mod query;
pub mod relation;
pub mod surface;
pub mod validation;

pub use auth::{AccessRequest, AclRule, AuthContext, AuthProvider, Permission, Principal};
pub use error::{ApiError, ApiResult};
pub use events::{ChangeEvent, ChangeType, EventBus};
pub use method::{AccessType, BaseMethod, HttpVerb, MethodScope};
pub use model::{MethodBinding, ModelHandle, Ownership, RemoteMethod};
pub use query::{Filter, QueryParams, Where};
pub use relation::{RelationDefinition, RelationKind, RelationOp};
pub use surface::{RemoteMethodHost, SurfaceDecision, disable_all_methods_with_exceptions};
pub use validation::{ValidationMode, ValidationRule};
