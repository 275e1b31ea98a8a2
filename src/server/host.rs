//! Application host
//!
//! [`AppHost`] holds everything remote methods need at request time. It is
//! built once by [`AppBuilder`](super::AppBuilder) and shared behind an `Arc`
//! by every route.

use crate::config::ServerSettings;
use crate::core::events::{ChangeEvent, ChangeType, EventBus};
use crate::core::model::ModelHandle;
use crate::identity::{RoleRegistry, TokenService};
use crate::server::registry::ModelRegistry;
use crate::storage::ModelStore;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct AppHost {
    pub settings: ServerSettings,

    /// Registered models with their allow-lists enforced
    pub models: ModelRegistry,

    pub store: Arc<dyn ModelStore>,
    pub tokens: Arc<TokenService>,
    pub roles: Arc<RoleRegistry>,

    /// Feeds `createChangeStream` subscribers
    pub events: Arc<EventBus>,
}

impl AppHost {
    pub fn from_builder_components(
        settings: ServerSettings,
        models: ModelRegistry,
        store: Arc<dyn ModelStore>,
        roles: Arc<RoleRegistry>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(
            store.clone(),
            roles.clone(),
            settings.token_ttl_seconds,
        ));
        let events = Arc::new(EventBus::new(settings.change_stream_capacity));

        Self {
            settings,
            models,
            store,
            tokens,
            roles,
            events,
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelHandle> {
        self.models.get(name)
    }

    /// Publish a change of one instance
    pub fn publish(&self, kind: ChangeType, model: &ModelHandle, id: Uuid, data: Option<Value>) {
        let delivered = self
            .events
            .publish(ChangeEvent::new(kind, model.name(), id, data));
        tracing::debug!(
            model = model.name(),
            change = kind.as_str(),
            %id,
            delivered,
            "change published"
        );
    }
}
