use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::dispatch::BusMessage;
use crate::{config::Config, motor::{MotorChannel, MotorCommand}};

/// Wildcard covering every sensor snapshot channel.
pub const SENSOR_SUBSCRIPTION: &str = "sensors/#";
/// Channel motor commands are published on.
pub const COMMAND_TOPIC: &str = "motor/command";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RETRY_PAUSE: Duration = Duration::from_secs(1);
const REQUEST_CAPACITY: usize = 64;

/// Every topic subscribed on (re)connect.
pub fn subscriptions() -> Vec<&'static str> {
    std::iter::once(SENSOR_SUBSCRIPTION)
        .chain(MotorChannel::ALL.iter().map(|c| c.topic()))
        .collect()
}

/// Connects to the broker and spawns the event loop and command publisher tasks.
///
/// Inbound publishes are pushed onto `inbound`; commands received on `commands`
/// are published on [`COMMAND_TOPIC`] at most once.
pub fn spawn(
    config: &Config,
    inbound: mpsc::Sender<BusMessage>,
    commands: mpsc::UnboundedReceiver<MotorCommand>,
) {
    let mut options = MqttOptions::new(
        config.mqtt_client_id.clone(),
        config.broker.host.clone(),
        config.broker.port,
    );
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);

    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    info!(
        host = %config.broker.host,
        port = config.broker.port,
        client_id = %config.mqtt_client_id,
        "MQTT client created"
    );

    tokio::spawn(run_event_loop(client.clone(), eventloop, inbound));
    tokio::spawn(publish_commands(client, commands));
}

async fn run_event_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    inbound: mpsc::Sender<BusMessage>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                subscribe_all(&client);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = BusMessage::new(publish.topic, publish.payload.to_vec());
                if inbound.send(msg).await.is_err() {
                    info!("Bus dispatcher closed; stopping MQTT event loop");
                    return;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!(pkid = ack.pkid, codes = ?ack.return_codes, "Subscription acknowledged");
            }
            Ok(_) => {}
            Err(e) => {
                // Polling again makes the client reconnect.
                warn!(error = %e, "MQTT connection error");
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

fn subscribe_all(client: &AsyncClient) {
    for topic in subscriptions() {
        match client.try_subscribe(topic, QoS::AtMostOnce) {
            Ok(()) => debug!(topic = %topic, "Subscription requested"),
            Err(e) => error!(topic = %topic, error = %e, "MQTT subscription error"),
        }
    }
}

async fn publish_commands(client: AsyncClient, mut commands: mpsc::UnboundedReceiver<MotorCommand>) {
    while let Some(command) = commands.recv().await {
        let body = match serde_json::to_vec(&command) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, command = ?command, "Failed to encode motor command");
                continue;
            }
        };

        match client.try_publish(COMMAND_TOPIC, QoS::AtMostOnce, false, body) {
            Ok(()) => info!(command = ?command, "Motor command published"),
            Err(e) => warn!(command = ?command, error = %e, "Failed to publish motor command"),
        }
    }
    debug!("Command channel closed; publisher stopped");
}
