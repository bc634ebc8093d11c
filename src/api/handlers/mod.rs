pub mod live;
pub mod motors;
pub mod predictions;
pub mod sensors;

use utoipa::OpenApi;

use crate::{
    api::dto::{
        HistoricalResponse, LoadRequest, MessageResponse, SensorReadingDto, SpeedCommandRequest,
        SpeedPredictionRequest, StartStopRequest, UsageRequest, VibrationRequest,
    },
    bus::LiveEvent,
    db::models::MotorStatus,
    motor::{FaultRecord, MotorSnapshot},
    predictions::models::{LoadPrediction, SpeedPrediction, StartStopAnalysis, UsagePrediction},
    sensors::{
        models::{FlowRate, Measurement, MeasurementInput, SensorReadingPayload},
        EfficiencySnapshot,
    },
};

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        sensors::get_latest_reading,
        sensors::get_historical_readings,
        sensors::get_leaks,
        sensors::get_efficiency,
        sensors::create_reading,
        motors::get_status,
        motors::start_motor,
        motors::stop_motor,
        motors::set_speed,
        motors::get_faults,
        predictions::predict,
        predictions::predict_usage,
        predictions::predict_load,
        predictions::predict_speed,
        predictions::analyze_start_stop,
        live::sensor_events,
        health,
    ),
    components(schemas(
        SensorReadingDto,
        SensorReadingPayload,
        FlowRate,
        Measurement,
        MeasurementInput,
        MotorStatus,
        HistoricalResponse,
        EfficiencySnapshot,
        MotorSnapshot,
        FaultRecord,
        MessageResponse,
        SpeedCommandRequest,
        VibrationRequest,
        UsageRequest,
        LoadRequest,
        SpeedPredictionRequest,
        StartStopRequest,
        UsagePrediction,
        LoadPrediction,
        SpeedPrediction,
        StartStopAnalysis,
        LiveEvent,
    )),
    tags(
        (name = "sensors",     description = "Stored sensor readings"),
        (name = "motors",      description = "Live motor state and commands"),
        (name = "predictions", description = "ML service gateway"),
        (name = "live",        description = "Push channel"),
        (name = "system",      description = "System endpoints"),
    ),
    info(
        title = "Pump Telemetry API",
        version = "0.1.0",
        description = "REST API for water-pump sensor data, motor control and predictions"
    )
)]
pub struct ApiDoc;
