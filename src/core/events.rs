//! Change notifications for model instances
//!
//! Mutating remote methods publish a [`ChangeEvent`] on the [`EventBus`];
//! `createChangeStream` subscribers receive the events of their model as
//! server-sent events.
//!
//! ```text
//! create / patch / replace / delete ──▶ EventBus::publish() ──▶ broadcast ──▶ change streams
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Remove,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Remove => "remove",
        }
    }
}

/// One change to one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub model: String,

    /// Id of the changed instance
    pub target: Uuid,

    /// Instance state after the change; absent for removals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeType, model: &str, target: Uuid, data: Option<Value>) -> Self {
        Self {
            kind,
            model: model.to_string(),
            target,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast channel shared by every change stream
///
/// Slow subscribers lag and skip events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers the event reached
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() {
        let target = Uuid::new_v4();
        let event = ChangeEvent::new(
            ChangeType::Create,
            "job",
            target,
            Some(json!({"title": "Engineer"})),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "create");
        assert_eq!(value["model"], "job");
        assert_eq!(value["target"], target.to_string());
        assert_eq!(value["data"]["title"], "Engineer");
    }

    #[test]
    fn test_removal_has_no_data() {
        let event = ChangeEvent::new(ChangeType::Remove, "offer", Uuid::new_v4(), None);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let target = Uuid::new_v4();

        let reached = bus.publish(ChangeEvent::new(ChangeType::Update, "search", target, None));
        assert_eq!(reached, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.target, target);
        assert_eq!(received.kind, ChangeType::Update);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let reached = bus.publish(ChangeEvent::new(ChangeType::Remove, "job", Uuid::new_v4(), None));
        assert_eq!(reached, 0);
        assert_eq!(bus.receiver_count(), 0);
    }
}
