use std::time::Duration;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// BrokerAddress
// ---------------------------------------------------------------------------

/// Host and port of the MQTT broker, parsed from `MQTT_BROKER_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When absent readings are kept in memory.
    pub database_url: Option<String>,
    pub broker: BrokerAddress,
    pub mqtt_client_id: String,
    /// Store full sensor snapshots received on `sensors/#`.
    pub persist_sensor_messages: bool,
    /// Base URL of the pattern service (usage/load/speed/start-stop).
    pub ml_service_url: String,
    /// Base URL of the vibration prediction service.
    pub prediction_service_url: String,
    pub ml_timeout: Duration,
    pub server_host: String,
    pub server_port: u16,
    /// Capacity of the live push channel.
    pub live_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            broker: parse_broker_url(&optional("MQTT_BROKER_URL", "mqtt://localhost:1883"))?,
            mqtt_client_id: optional("MQTT_CLIENT_ID", "pump-telemetry-service"),
            persist_sensor_messages: parse_bool(&optional("PERSIST_SENSOR_MESSAGES", "false"))
                .context("PERSIST_SENSOR_MESSAGES must be true or false")?,
            ml_service_url: trim_base(optional("ML_SERVICE_URL", "http://localhost:5051")),
            prediction_service_url: trim_base(optional(
                "PREDICTION_SERVICE_URL",
                "http://localhost:5050",
            )),
            ml_timeout: Duration::from_secs(
                optional("ML_TIMEOUT_SECS", "10")
                    .parse()
                    .context("ML_TIMEOUT_SECS must be a positive integer")?,
            ),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "5000")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            live_buffer: optional("LIVE_BUFFER", "256")
                .parse()
                .context("LIVE_BUFFER must be a positive integer")?,
        })
    }
}

/// Parse `mqtt://host:port` (scheme and port optional) into a `BrokerAddress`.
fn parse_broker_url(raw: &str) -> Result<BrokerAddress> {
    let rest = raw
        .trim()
        .strip_prefix("mqtt://")
        .or_else(|| raw.trim().strip_prefix("tcp://"))
        .unwrap_or(raw.trim());
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("invalid port in MQTT_BROKER_URL: {raw:?}"))?,
        ),
        None => (rest, 1883),
    };

    if host.is_empty() {
        anyhow::bail!("MQTT_BROKER_URL has no host: {raw:?}");
    }

    Ok(BrokerAddress {
        host: host.to_owned(),
        port,
    })
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("not a boolean: {other:?}")),
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_owned()
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
