use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::{info, warn};

use crate::{
    api::AppState,
    bus::{live::SENSOR_EVENT, LiveEvent, LiveFeed},
};

/// Server-sent `sensorData` events, one per message on the `sensors/#` channels.
#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Stream of sensorData events", body = LiveEvent, content_type = "text/event-stream"),
    ),
    tag = "live"
)]
pub async fn sensor_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(viewers = state.live.viewer_count() + 1, "Live viewer connected");
    Sse::new(event_stream(&state.live)).keep_alive(KeepAlive::default())
}

fn event_stream(live: &LiveFeed) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(live.subscribe()).filter_map(|item| match item {
        Ok(event) => match Event::default().event(SENSOR_EVENT).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                warn!(channel = %event.channel, error = %e, "Failed to encode live event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped, "Live viewer lagging; events dropped");
            None
        }
    })
}
