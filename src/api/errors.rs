use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{motor::MotorError, predictions::GatewayError};

const GENERIC_ERROR: &str = "Server error";

/// Error returned by every handler. Only validation, not-found and unavailable
/// messages reach the caller; internal details are logged instead.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Unavailable(String),
    Internal {
        message: &'static str,
        source: anyhow::Error,
    },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(m) | AppError::NotFound(m) | AppError::Unavailable(m) => m,
            AppError::Internal { message, source } => {
                error!(error = ?source, "Request failed");
                message.to_owned()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal {
            message: GENERIC_ERROR,
            source: e,
        }
    }
}

impl From<MotorError> for AppError {
    fn from(e: MotorError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(_) => Self::Unavailable(e.to_string()),
            GatewayError::Failed { operation, source } => Self::Internal {
                message: operation.failure_message(),
                source,
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        Self::Validation(e.body_text())
    }
}
