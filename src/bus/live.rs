use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;

/// Name of the push event carrying a [`LiveEvent`].
pub const SENSOR_EVENT: &str = "sensorData";

/// One sensor message relayed to live viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiveEvent {
    /// Broker topic the message arrived on, e.g. `sensors/pump1`.
    pub channel: String,
    /// Parsed JSON body, unchanged.
    pub payload: serde_json::Value,
}

/// Fan-out of live sensor messages to every connected viewer.
///
/// Viewers that fall more than the channel capacity behind miss the overflow.
#[derive(Clone)]
pub struct LiveFeed {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of viewers that received the event.
    pub fn publish(&self, event: LiveEvent) -> usize {
        // No viewers connected is not an error.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
