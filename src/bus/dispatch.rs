use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::live::{LiveEvent, LiveFeed};
use crate::{
    motor::{MotorChannel, MotorTracker},
    sensors::{models::SensorReadingPayload, TelemetryStore},
};

/// Prefix of the channels carrying full JSON sensor snapshots.
pub const SENSOR_TOPIC_PREFIX: &str = "sensors/";

/// One inbound broker message.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Where an inbound message goes, decided by its topic alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Sensor,
    Motor(MotorChannel),
    Ignore,
}

impl Route {
    pub fn for_topic(topic: &str) -> Self {
        if let Some(channel) = MotorChannel::from_topic(topic) {
            Route::Motor(channel)
        } else if topic.starts_with(SENSOR_TOPIC_PREFIX) || topic == "sensors" {
            Route::Sensor
        } else {
            Route::Ignore
        }
    }
}

/// Consumes the inbound queue and routes each message to live viewers, the
/// store, or the motor tracker.
pub struct Dispatcher {
    store: TelemetryStore,
    motor: MotorTracker,
    live: LiveFeed,
    persist_sensor_messages: bool,
}

impl Dispatcher {
    pub fn new(
        store: TelemetryStore,
        motor: MotorTracker,
        live: LiveFeed,
        persist_sensor_messages: bool,
    ) -> Self {
        Self {
            store,
            motor,
            live,
            persist_sensor_messages,
        }
    }

    /// Runs until every sender of `inbound` is dropped.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self, mut inbound: mpsc::Receiver<BusMessage>) {
        info!(
            persist_sensor_messages = self.persist_sensor_messages,
            "Bus dispatcher started"
        );
        while let Some(msg) = inbound.recv().await {
            self.handle(msg).await;
        }
        info!("Bus dispatcher stopped");
    }

    pub async fn handle(&self, msg: BusMessage) {
        match Route::for_topic(&msg.topic) {
            Route::Sensor => self.handle_sensor(msg).await,
            Route::Motor(channel) => self.handle_motor(channel, &msg).await,
            Route::Ignore => debug!(topic = %msg.topic, "Ignoring message on unrouted topic"),
        }
    }

    async fn handle_sensor(&self, msg: BusMessage) {
        let payload: serde_json::Value = match serde_json::from_slice(&msg.payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(topic = %msg.topic, error = %e, "Dropping sensor message with invalid JSON");
                return;
            }
        };

        let snapshot = self
            .persist_sensor_messages
            .then(|| serde_json::from_value::<SensorReadingPayload>(payload.clone()));

        let viewers = self.live.publish(LiveEvent {
            channel: msg.topic.clone(),
            payload,
        });
        debug!(topic = %msg.topic, viewers, "Sensor message relayed");

        match snapshot {
            Some(Ok(snapshot)) => {
                if let Err(e) = self.store.ingest(snapshot).await {
                    warn!(topic = %msg.topic, error = %e, "Failed to persist sensor message");
                }
            }
            Some(Err(e)) => {
                warn!(topic = %msg.topic, error = %e, "Sensor message is not a reading; not persisted");
            }
            None => {}
        }
    }

    async fn handle_motor(&self, channel: MotorChannel, msg: &BusMessage) {
        match parse_scalar(&msg.payload) {
            Some(value) => self.motor.update(channel, value).await,
            None => warn!(
                topic = %msg.topic,
                payload = %String::from_utf8_lossy(&msg.payload),
                "Dropping motor message that is not a number"
            ),
        }
    }
}

/// Parse a bare decimal number, tolerating surrounding whitespace.
pub fn parse_scalar(payload: &[u8]) -> Option<f64> {
    std::str::from_utf8(payload)
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{motor::MotorCommand, sensors::HistoryQuery};

    struct Harness {
        dispatcher: Dispatcher,
        store: TelemetryStore,
        motor: MotorTracker,
        live: LiveFeed,
        _commands: mpsc::UnboundedReceiver<MotorCommand>,
    }

    fn harness(persist: bool) -> Harness {
        let store = TelemetryStore::memory();
        let (tx, rx) = mpsc::unbounded_channel();
        let motor = MotorTracker::new(tx);
        let live = LiveFeed::new(16);
        Harness {
            dispatcher: Dispatcher::new(store.clone(), motor.clone(), live.clone(), persist),
            store,
            motor,
            live,
            _commands: rx,
        }
    }

    async fn stored_count(store: &TelemetryStore) -> u64 {
        let q = HistoryQuery { start: None, end: None, page: 1, limit: 100 };
        store.query(&q).await.unwrap().total
    }

    #[test]
    fn routes_by_topic() {
        assert_eq!(Route::for_topic("sensors/pump1"), Route::Sensor);
        assert_eq!(Route::for_topic("sensors/a/b"), Route::Sensor);
        assert_eq!(Route::for_topic("motor/voltage"), Route::Motor(MotorChannel::Voltage));
        assert_eq!(Route::for_topic("motor/current"), Route::Motor(MotorChannel::Current));
        assert_eq!(
            Route::for_topic("motor/temperature"),
            Route::Motor(MotorChannel::Temperature)
        );
        assert_eq!(Route::for_topic("motor/command"), Route::Ignore);
        assert_eq!(Route::for_topic("sensorsX"), Route::Ignore);
    }

    #[test]
    fn parse_scalar_accepts_plain_numbers_only() {
        assert_eq!(parse_scalar(b"230.5"), Some(230.5));
        assert_eq!(parse_scalar(b" 16\n"), Some(16.0));
        assert_eq!(parse_scalar(b"-4"), Some(-4.0));
        assert_eq!(parse_scalar(b"abc"), None);
        assert_eq!(parse_scalar(b""), None);
        assert_eq!(parse_scalar(b"NaN"), None);
        assert_eq!(parse_scalar(&[0xff, 0xfe]), None);
    }

    #[tokio::test]
    async fn sensor_message_is_relayed_unchanged() {
        let h = harness(false);
        let mut rx = h.live.subscribe();
        let body = json!({ "flowRate": { "inlet": 3.2, "outlet": 3.0 }, "extra": [1, 2] });

        h.dispatcher
            .handle(BusMessage::new("sensors/pump1", body.to_string()))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, "sensors/pump1");
        assert_eq!(event.payload, body);
        assert_eq!(stored_count(&h.store).await, 0);
    }

    #[tokio::test]
    async fn sensor_message_is_persisted_when_enabled() {
        let h = harness(true);
        let body = json!({ "flowRate": { "inlet": 3.2, "outlet": 3.0 }, "leakDetected": true });

        h.dispatcher
            .handle(BusMessage::new("sensors/pump1", body.to_string()))
            .await;
        h.dispatcher
            .handle(BusMessage::new("sensors/pump1", body.to_string()))
            .await;

        assert_eq!(stored_count(&h.store).await, 2);
        let latest = h.store.latest().await.unwrap().unwrap();
        assert_eq!(latest.flow_outlet, 3.0);
        assert!(latest.leak_detected);
    }

    #[tokio::test]
    async fn non_reading_sensor_message_is_still_relayed() {
        let h = harness(true);
        let mut rx = h.live.subscribe();

        h.dispatcher
            .handle(BusMessage::new("sensors/status", r#"{"motorStatus":"spinning"}"#))
            .await;

        assert_eq!(rx.recv().await.unwrap().channel, "sensors/status");
        assert_eq!(stored_count(&h.store).await, 0);
    }

    #[tokio::test]
    async fn invalid_json_is_dropped() {
        let h = harness(true);
        let mut rx = h.live.subscribe();

        h.dispatcher
            .handle(BusMessage::new("sensors/pump1", "not json"))
            .await;

        assert!(rx.try_recv().is_err());
        assert_eq!(stored_count(&h.store).await, 0);
    }

    #[tokio::test]
    async fn motor_messages_update_snapshot_without_relay() {
        let h = harness(true);
        let mut rx = h.live.subscribe();

        h.dispatcher.handle(BusMessage::new("motor/voltage", "220")).await;
        h.dispatcher.handle(BusMessage::new("motor/current", "16")).await;
        h.dispatcher.handle(BusMessage::new("motor/temperature", "0")).await;

        let s = h.motor.status().await;
        assert_eq!(s.voltage, 220.0);
        assert_eq!(s.current, 16.0);
        assert_eq!(s.efficiency, 100.0);
        assert!(rx.try_recv().is_err());
        assert_eq!(stored_count(&h.store).await, 0);
    }

    #[tokio::test]
    async fn malformed_motor_value_leaves_snapshot_alone() {
        let h = harness(false);
        h.dispatcher.handle(BusMessage::new("motor/voltage", "230")).await;
        h.dispatcher.handle(BusMessage::new("motor/voltage", "high")).await;
        assert_eq!(h.motor.status().await.voltage, 230.0);
    }

    #[tokio::test]
    async fn run_drains_queue_until_closed() {
        let h = harness(false);
        let (tx, rx) = mpsc::channel(8);
        tx.send(BusMessage::new("motor/current", "12.5")).await.unwrap();
        tx.send(BusMessage::new("other/topic", "x")).await.unwrap();
        drop(tx);

        h.dispatcher.run(rx).await;
        assert_eq!(h.motor.status().await.current, 12.5);
    }
}
