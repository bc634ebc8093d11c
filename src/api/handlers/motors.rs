use axum::{extract::{rejection::JsonRejection, State}, Json};

use crate::{
    api::{
        dto::{MessageResponse, SpeedCommandRequest},
        errors::AppError,
        AppState,
    },
    motor::{FaultRecord, MotorSnapshot},
};

/// Live motor snapshot: latest channel values, derived efficiency and run state.
#[utoipa::path(
    get,
    path = "/api/motors/status",
    responses(
        (status = 200, description = "Motor snapshot", body = MotorSnapshot),
    ),
    tag = "motors"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<MotorSnapshot> {
    Json(state.motor.status().await)
}

#[utoipa::path(
    post,
    path = "/api/motors/start",
    responses(
        (status = 200, description = "Start command sent", body = MessageResponse),
    ),
    tag = "motors"
)]
pub async fn start_motor(State(state): State<AppState>) -> Json<MessageResponse> {
    state.motor.start().await;
    Json(MessageResponse::new("Start command sent successfully"))
}

#[utoipa::path(
    post,
    path = "/api/motors/stop",
    responses(
        (status = 200, description = "Stop command sent", body = MessageResponse),
    ),
    tag = "motors"
)]
pub async fn stop_motor(State(state): State<AppState>) -> Json<MessageResponse> {
    state.motor.stop().await;
    Json(MessageResponse::new("Stop command sent successfully"))
}

#[utoipa::path(
    post,
    path = "/api/motors/speed",
    request_body = SpeedCommandRequest,
    responses(
        (status = 200, description = "Speed command sent", body = MessageResponse),
        (status = 400, description = "Speed missing or outside 0–100"),
    ),
    tag = "motors"
)]
pub async fn set_speed(
    State(state): State<AppState>,
    body: Result<Json<SpeedCommandRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(body) = body?;
    state.motor.set_speed(body.speed).await?;
    Ok(Json(MessageResponse::new("Speed command sent successfully")))
}

#[utoipa::path(
    get,
    path = "/api/motors/faults",
    responses(
        (status = 200, description = "Fault history", body = Vec<FaultRecord>),
    ),
    tag = "motors"
)]
pub async fn get_faults(State(state): State<AppState>) -> Json<Vec<FaultRecord>> {
    Json(state.motor.faults().await)
}
