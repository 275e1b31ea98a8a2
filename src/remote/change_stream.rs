//! `createChangeStream`: server-sent events for one model

use super::{RemoteContext, Reply};
use crate::core::events::EventBus;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Events of `model` as they are published
///
/// Subscribers that fall behind skip the events they missed.
pub fn model_events(
    bus: &EventBus,
    model: &str,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    let model = model.to_string();

    BroadcastStream::new(bus.subscribe()).filter_map(move |received| match received {
        Ok(change) if change.model == model => Some(
            Event::default()
                .event(change.kind.as_str())
                .json_data(&change),
        ),
        Ok(_) => None,
        Err(lagged) => {
            tracing::debug!(model = %model, "change stream {}", lagged);
            None
        }
    })
}

pub fn open(ctx: &RemoteContext<'_>) -> Reply {
    tracing::debug!(model = ctx.model.name(), "change stream opened");
    let stream = model_events(&ctx.host.events, ctx.model.name());
    Reply::Raw(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}
