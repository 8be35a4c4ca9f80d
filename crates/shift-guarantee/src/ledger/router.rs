use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ShiftCommitment, ShiftId, ShiftStatus, WorkerId, WorkerStanding};
use super::repository::{GuaranteeAuditLog, RepositoryError, ShiftRepository};
use super::service::{GuaranteeService, GuaranteeServiceError, DEFAULT_HISTORY_LIMIT};
use crate::engine::{AccuracyFilter, EngineError};

/// Body of a commit request: the shift plus the worker's standing at commitment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitShiftRequest {
    #[serde(flatten)]
    pub commitment: ShiftCommitment,
    pub standing: WorkerStanding,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordEarningsRequest {
    pub actual_earnings: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShiftListQuery {
    pub status: Option<ShiftStatus>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GuaranteeHistoryQuery {
    pub limit: Option<usize>,
}

/// Router exposing the committed-shift lifecycle over HTTP.
pub fn guarantee_router<R, A>(service: Arc<GuaranteeService<R, A>>) -> Router
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    Router::new()
        .route("/api/v1/shifts", post(commit_handler::<R, A>))
        .route("/api/v1/shifts/accuracy", post(accuracy_handler::<R, A>))
        .route("/api/v1/shifts/:shift_id", get(shift_handler::<R, A>))
        .route(
            "/api/v1/shifts/:shift_id/earnings",
            post(earnings_handler::<R, A>),
        )
        .route("/api/v1/shifts/:shift_id/cancel", post(cancel_handler::<R, A>))
        .route(
            "/api/v1/workers/:worker_id/guarantee-summary",
            get(summary_handler::<R, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/volatility",
            get(volatility_handler::<R, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/shifts",
            get(worker_shifts_handler::<R, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/guarantee-history",
            get(history_handler::<R, A>),
        )
        .route(
            "/api/v1/workers/:worker_id/performance-report",
            get(performance_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn commit_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    axum::Json(request): axum::Json<CommitShiftRequest>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.commit(request.commitment, &request.standing) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn shift_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(shift_id): Path<String>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.get(&ShiftId(shift_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn earnings_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(shift_id): Path<String>,
    axum::Json(request): axum::Json<RecordEarningsRequest>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.record_actual_earnings(&ShiftId(shift_id), request.actual_earnings) {
        Ok(settlement) => (StatusCode::OK, axum::Json(settlement)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(shift_id): Path<String>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.cancel(&ShiftId(shift_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summary_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.worker_summary(&WorkerId(worker_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn volatility_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.worker_volatility(&WorkerId(worker_id)) {
        Ok(summary) => {
            let payload = json!({
                "interpretation": summary.interpretation(),
                "summary": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn worker_shifts_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(worker_id): Path<String>,
    Query(query): Query<ShiftListQuery>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.worker_shifts(&WorkerId(worker_id), query.status) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(worker_id): Path<String>,
    Query(query): Query<GuaranteeHistoryQuery>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match service.guarantee_history(&WorkerId(worker_id), limit) {
        Ok(events) => (StatusCode::OK, axum::Json(events)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn performance_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.performance_report(&WorkerId(worker_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn accuracy_handler<R, A>(
    State(service): State<Arc<GuaranteeService<R, A>>>,
    axum::Json(filter): axum::Json<AccuracyFilter>,
) -> Response
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    match service.prediction_accuracy(&filter) {
        Ok(report) => {
            let payload = json!({
                "filter": filter.describe(),
                "report": report,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_status(error: &GuaranteeServiceError) -> StatusCode {
    match error {
        GuaranteeServiceError::Engine(EngineError::InvalidInput { .. })
        | GuaranteeServiceError::Engine(EngineError::InsufficientData { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GuaranteeServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        GuaranteeServiceError::Repository(
            RepositoryError::Conflict
            | RepositoryError::AlreadySettled
            | RepositoryError::NotCommitted,
        ) => StatusCode::CONFLICT,
        GuaranteeServiceError::Repository(RepositoryError::Unavailable(_))
        | GuaranteeServiceError::Audit(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: GuaranteeServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (error_status(&error), axum::Json(payload)).into_response()
}
