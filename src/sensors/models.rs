//! Wire shapes for sensor snapshots, shared by the REST ingest endpoint and the
//! `sensors/#` MQTT channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{MotorStatus, NewSensorReading};

pub const DEFAULT_VOLTAGE_UNIT: &str = "V";
pub const DEFAULT_CURRENT_UNIT: &str = "A";
pub const DEFAULT_POWER_UNIT: &str = "W";
pub const DEFAULT_TEMPERATURE_UNIT: &str = "°C";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FlowRate {
    /// L/min
    #[serde(default)]
    pub inlet: f64,
    /// L/min
    #[serde(default)]
    pub outlet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

/// A measurement as sent by a device; the unit falls back to the quantity's default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct MeasurementInput {
    #[serde(default)]
    pub value: f64,
    pub unit: Option<String>,
}

impl MeasurementInput {
    fn resolve(self, default_unit: &str) -> (f64, String) {
        (self.value, self.unit.unwrap_or_else(|| default_unit.to_owned()))
    }
}

/// Full sensor snapshot as published by a field device or posted to `POST /api/sensors`.
/// Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingPayload {
    /// Capture time; defaults to the time of ingestion.
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flow_rate: FlowRate,
    #[serde(default)]
    pub voltage: MeasurementInput,
    #[serde(default)]
    pub current: MeasurementInput,
    #[serde(default)]
    pub power: MeasurementInput,
    #[serde(default)]
    pub temperature: MeasurementInput,
    #[serde(default)]
    pub leak_detected: bool,
    #[serde(default)]
    pub motor_status: MotorStatus,
}

impl SensorReadingPayload {
    /// Resolve defaults against `now` and flatten into column values.
    pub fn into_new_reading(self, now: DateTime<Utc>) -> NewSensorReading {
        let (voltage_value, voltage_unit) = self.voltage.resolve(DEFAULT_VOLTAGE_UNIT);
        let (current_value, current_unit) = self.current.resolve(DEFAULT_CURRENT_UNIT);
        let (power_value, power_unit) = self.power.resolve(DEFAULT_POWER_UNIT);
        let (temperature_value, temperature_unit) =
            self.temperature.resolve(DEFAULT_TEMPERATURE_UNIT);

        NewSensorReading {
            recorded_at: self.timestamp.unwrap_or(now),
            flow_inlet: self.flow_rate.inlet,
            flow_outlet: self.flow_rate.outlet,
            voltage_value,
            voltage_unit,
            current_value,
            current_unit,
            power_value,
            power_unit,
            temperature_value,
            temperature_unit,
            leak_detected: self.leak_detected,
            motor_status: self.motor_status,
        }
    }
}
