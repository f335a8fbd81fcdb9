use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::PiRiskError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::Unprocessable(s) => (StatusCode::UNPROCESSABLE_ENTITY, s),
            AppError::NotFound(s) => (StatusCode::NOT_FOUND, s),
            AppError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
        };
        (code, Json(ErrBody { error: msg.clone() })).into_response()
    }
}

// Input problems are echoed back verbatim; server-side failures are logged
// in full and only summarised to the client.
impl From<PiRiskError> for AppError {
    fn from(err: PiRiskError) -> Self {
        if err.is_input_error() {
            return AppError::Unprocessable(err.to_string());
        }

        match err {
            PiRiskError::Serialization { context, source } => {
                AppError::BadRequest(format!("Serialization {context} failed: {source}"))
            }
            PiRiskError::SchemaMismatch { columns, .. } => {
                tracing::error!(%columns, "feature row does not match the model schema");
                AppError::Internal(format!("feature schema mismatch: {columns}"))
            }
            other => {
                tracing::error!(error = %other, "prediction failed");
                AppError::Internal("prediction failed".to_string())
            }
        }
    }
}
