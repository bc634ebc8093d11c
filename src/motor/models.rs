use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The three scalar motor channels carried on `motor/<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorChannel {
    Voltage,
    Current,
    Temperature,
}

impl MotorChannel {
    pub const ALL: [MotorChannel; 3] = [
        MotorChannel::Voltage,
        MotorChannel::Current,
        MotorChannel::Temperature,
    ];

    pub fn topic(self) -> &'static str {
        match self {
            MotorChannel::Voltage => "motor/voltage",
            MotorChannel::Current => "motor/current",
            MotorChannel::Temperature => "motor/temperature",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.topic() == topic)
    }
}

impl fmt::Display for MotorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// Live, non-persisted view of the motor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MotorSnapshot {
    /// Volts
    pub voltage: f64,
    /// Amperes
    pub current: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percentage, unclamped.
    pub efficiency: f64,
    pub is_running: bool,
    /// Target speed, 0–100.
    pub speed: f64,
    /// Cumulative running time in seconds.
    pub runtime: u64,
    /// Last fault code. No code path sets it yet.
    pub fault_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FaultRecord {
    pub id: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Published as JSON on `motor/command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MotorCommand {
    Start,
    Stop,
    SetSpeed { speed: f64 },
}
