use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::{
    api::{
        dto::{LoadRequest, SpeedPredictionRequest, StartStopRequest, UsageRequest, VibrationRequest},
        errors::AppError,
        AppState,
    },
    predictions::models::{LoadPrediction, SpeedPrediction, StartStopAnalysis, UsagePrediction},
};

/// Vibration health prediction, relayed unchanged from the prediction service.
#[utoipa::path(
    post,
    path = "/api/predictions/predict",
    request_body = VibrationRequest,
    responses(
        (status = 200, description = "Prediction service answer"),
        (status = 400, description = "vibration missing or not a number"),
        (status = 503, description = "Prediction service unreachable"),
        (status = 500, description = "Prediction failed"),
    ),
    tag = "predictions"
)]
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<VibrationRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    info!(vibration = body.vibration, "Vibration prediction requested");
    Ok(Json(state.predictions.predict_vibration(body.vibration).await?))
}

#[utoipa::path(
    post,
    path = "/api/ml/predict-usage",
    request_body = UsageRequest,
    responses(
        (status = 200, description = "Usage pattern", body = UsagePrediction),
        (status = 400, description = "hours missing or not a number"),
        (status = 503, description = "ML service unreachable"),
        (status = 500, description = "Prediction failed"),
    ),
    tag = "predictions"
)]
pub async fn predict_usage(
    State(state): State<AppState>,
    body: Result<Json<UsageRequest>, JsonRejection>,
) -> Result<Json<UsagePrediction>, AppError> {
    let Json(body) = body?;
    info!(hours = body.hours, "Usage pattern prediction requested");
    Ok(Json(state.predictions.predict_usage(body.hours).await?))
}

#[utoipa::path(
    post,
    path = "/api/ml/predict-load",
    request_body = LoadRequest,
    responses(
        (status = 200, description = "Load classification", body = LoadPrediction),
        (status = 400, description = "load missing or not a number"),
        (status = 503, description = "ML service unreachable"),
        (status = 500, description = "Prediction failed"),
    ),
    tag = "predictions"
)]
pub async fn predict_load(
    State(state): State<AppState>,
    body: Result<Json<LoadRequest>, JsonRejection>,
) -> Result<Json<LoadPrediction>, AppError> {
    let Json(body) = body?;
    info!(load = body.load, "Load prediction requested");
    Ok(Json(state.predictions.predict_load(body.load).await?))
}

#[utoipa::path(
    post,
    path = "/api/ml/predict-speed",
    request_body = SpeedPredictionRequest,
    responses(
        (status = 200, description = "Optimal speed", body = SpeedPrediction),
        (status = 400, description = "speed missing or not a number"),
        (status = 503, description = "ML service unreachable"),
        (status = 500, description = "Prediction failed"),
    ),
    tag = "predictions"
)]
pub async fn predict_speed(
    State(state): State<AppState>,
    body: Result<Json<SpeedPredictionRequest>, JsonRejection>,
) -> Result<Json<SpeedPrediction>, AppError> {
    let Json(body) = body?;
    info!(speed = body.speed, "Speed optimisation requested");
    Ok(Json(state.predictions.predict_speed(body.speed).await?))
}

/// Start/stop cycling analysis. The vibration change sent downstream is simulated.
#[utoipa::path(
    post,
    path = "/api/ml/analyze-start-stop",
    request_body = StartStopRequest,
    responses(
        (status = 200, description = "Start/stop pattern", body = StartStopAnalysis),
        (status = 400, description = "timestamp missing"),
        (status = 503, description = "ML service unreachable"),
        (status = 500, description = "Analysis failed"),
    ),
    tag = "predictions"
)]
pub async fn analyze_start_stop(
    State(state): State<AppState>,
    body: Result<Json<StartStopRequest>, JsonRejection>,
) -> Result<Json<StartStopAnalysis>, AppError> {
    let Json(body) = body?;
    let timestamp = body
        .timestamp
        .filter(|t| !t.is_null())
        .ok_or_else(|| AppError::Validation("timestamp is required".into()))?;
    info!(timestamp = %timestamp, "Start/stop analysis requested");
    Ok(Json(state.predictions.analyze_start_stop().await?))
}
