use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Mirrors the `motor_status` Postgres enum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "motor_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MotorStatus {
    Running,
    #[default]
    Stopped,
    Fault,
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotorStatus::Running => "running",
            MotorStatus::Stopped => "stopped",
            MotorStatus::Fault => "fault",
        };
        f.write_str(s)
    }
}

/// One row of `sensor_readings`. Measurements are stored flat, each with its unit.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// L/min
    pub flow_inlet: f64,
    /// L/min
    pub flow_outlet: f64,
    pub voltage_value: f64,
    pub voltage_unit: String,
    pub current_value: f64,
    pub current_unit: String,
    pub power_value: f64,
    pub power_unit: String,
    pub temperature_value: f64,
    pub temperature_unit: String,
    pub leak_detected: bool,
    pub motor_status: MotorStatus,
}

/// Column values for an insert; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorReading {
    pub recorded_at: DateTime<Utc>,
    pub flow_inlet: f64,
    pub flow_outlet: f64,
    pub voltage_value: f64,
    pub voltage_unit: String,
    pub current_value: f64,
    pub current_unit: String,
    pub power_value: f64,
    pub power_unit: String,
    pub temperature_value: f64,
    pub temperature_unit: String,
    pub leak_detected: bool,
    pub motor_status: MotorStatus,
}

impl NewSensorReading {
    pub fn into_reading(self, id: Uuid) -> SensorReading {
        SensorReading {
            id,
            recorded_at: self.recorded_at,
            flow_inlet: self.flow_inlet,
            flow_outlet: self.flow_outlet,
            voltage_value: self.voltage_value,
            voltage_unit: self.voltage_unit,
            current_value: self.current_value,
            current_unit: self.current_unit,
            power_value: self.power_value,
            power_unit: self.power_unit,
            temperature_value: self.temperature_value,
            temperature_unit: self.temperature_unit,
            leak_detected: self.leak_detected,
            motor_status: self.motor_status,
        }
    }
}
