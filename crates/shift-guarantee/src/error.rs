use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::import::ShiftImportError;
use crate::ledger::GuaranteeServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Ledger(#[from] GuaranteeServiceError),
    #[error("import error: {0}")]
    Import(#[from] ShiftImportError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Ledger(err) => crate::ledger::router::error_status(err),
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
