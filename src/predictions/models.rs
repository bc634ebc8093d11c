//! Request and response bodies of the external ML services. Field names follow the
//! services' own capitalised feature names.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Vibration level assumed when no live value is supplied.
pub const DEFAULT_VIBRATION_LEVEL: f64 = 2000.0;
/// Horsepower → kilowatt factor applied to the requested load.
pub const LOAD_POWER_FACTOR: f64 = 0.746;
pub const SPEED_FLOW_FACTOR: f64 = 0.1;
pub const SPEED_POWER_FACTOR: f64 = 0.02;
pub const DEFAULT_SYSTEM_PRESSURE: f64 = 50.0;
/// Simulated vibration change range for start/stop analysis, `[low, high)`.
pub const VIBRATION_CHANGE_RANGE: (f64, f64) = (30.0, 70.0);

// ---------------------------------------------------------------------------
// Outbound feature payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UsageFeatures {
    pub hour: u32,
    /// Weekday, Sunday = 0.
    pub day: u32,
    #[serde(rename = "Vibration_Level")]
    pub vibration_level: f64,
    #[serde(rename = "Usage_Frequency")]
    pub usage_frequency: f64,
}

impl UsageFeatures {
    pub fn at<Tz: TimeZone>(hours: f64, now: &DateTime<Tz>) -> Self {
        Self {
            hour: now.hour(),
            day: now.weekday().num_days_from_sunday(),
            vibration_level: DEFAULT_VIBRATION_LEVEL,
            usage_frequency: hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadFeatures {
    #[serde(rename = "Vibration_Level")]
    pub vibration_level: f64,
    #[serde(rename = "Motor_Current")]
    pub motor_current: f64,
    #[serde(rename = "Power_Consumption")]
    pub power_consumption: f64,
}

impl LoadFeatures {
    pub fn from_load(load: f64) -> Self {
        Self {
            vibration_level: DEFAULT_VIBRATION_LEVEL,
            motor_current: load,
            power_consumption: load * LOAD_POWER_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedFeatures {
    #[serde(rename = "Required_Flow_Rate")]
    pub required_flow_rate: f64,
    #[serde(rename = "System_Pressure")]
    pub system_pressure: f64,
    #[serde(rename = "Power_Consumption")]
    pub power_consumption: f64,
}

impl SpeedFeatures {
    pub fn from_speed(speed: f64) -> Self {
        Self {
            required_flow_rate: speed * SPEED_FLOW_FACTOR,
            system_pressure: DEFAULT_SYSTEM_PRESSURE,
            power_consumption: speed * SPEED_POWER_FACTOR,
        }
    }
}

/// The vibration change is simulated, not taken from live sensor data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartStopFeatures {
    #[serde(rename = "Vibration_Change")]
    pub vibration_change: f64,
}

impl StartStopFeatures {
    pub fn simulated<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (low, high) = VIBRATION_CHANGE_RANGE;
        Self {
            vibration_change: rng.gen_range(low..high),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationFeatures {
    pub vibration: f64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsagePrediction {
    #[serde(rename = "Usage_Pattern")]
    pub usage_pattern: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadPrediction {
    #[serde(rename = "Load_Type")]
    pub load_type: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpeedPrediction {
    #[serde(rename = "Optimal_Speed")]
    pub optimal_speed: f64,
    #[serde(rename = "Unit")]
    pub unit: String,
}

/// Raw start/stop answer of the pattern service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartStopResponse {
    #[serde(rename = "Start_Stop_Status")]
    pub start_stop_status: String,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
}

/// Start/stop analysis in the shape the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StartStopAnalysis {
    #[serde(rename = "Pattern")]
    pub pattern: String,
    #[serde(rename = "Recommendations")]
    pub recommendations: String,
}

impl From<StartStopResponse> for StartStopAnalysis {
    fn from(r: StartStopResponse) -> Self {
        Self {
            pattern: r.start_stop_status,
            recommendations: r.recommendation,
        }
    }
}
