use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::models::{MotorStatus, SensorReading},
    sensors::{
        models::{FlowRate, Measurement},
        ReadingPage,
    },
};

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingDto {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub flow_rate: FlowRate,
    pub voltage: Measurement,
    pub current: Measurement,
    pub power: Measurement,
    pub temperature: Measurement,
    pub leak_detected: bool,
    pub motor_status: MotorStatus,
}

impl From<SensorReading> for SensorReadingDto {
    fn from(r: SensorReading) -> Self {
        Self {
            id: r.id,
            timestamp: r.recorded_at,
            flow_rate: FlowRate {
                inlet: r.flow_inlet,
                outlet: r.flow_outlet,
            },
            voltage: Measurement {
                value: r.voltage_value,
                unit: r.voltage_unit,
            },
            current: Measurement {
                value: r.current_value,
                unit: r.current_unit,
            },
            power: Measurement {
                value: r.power_value,
                unit: r.power_unit,
            },
            temperature: Measurement {
                value: r.temperature_value,
                unit: r.temperature_unit,
            },
            leak_detected: r.leak_detected,
            motor_status: r.motor_status,
        }
    }
}

/// Query string of `GET /api/sensors/historical`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Inclusive lower bound (RFC3339).
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC3339).
    pub end_date: Option<DateTime<Utc>>,
    /// 1-based page number, default 1.
    pub page: Option<u32>,
    /// Page size, default 100.
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalResponse {
    pub data: Vec<SensorReadingDto>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

impl From<ReadingPage> for HistoricalResponse {
    fn from(p: ReadingPage) -> Self {
        Self {
            data: p.data.into_iter().map(Into::into).collect(),
            total: p.total,
            pages: p.pages,
            current_page: p.current_page,
        }
    }
}

// ---------------------------------------------------------------------------
// Motor
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpeedCommandRequest {
    /// Target speed, 0–100.
    pub speed: f64,
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct VibrationRequest {
    pub vibration: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UsageRequest {
    pub hours: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoadRequest {
    pub load: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpeedPredictionRequest {
    pub speed: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartStopRequest {
    /// Time of the start/stop event; required but not forwarded.
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<serde_json::Value>,
}
