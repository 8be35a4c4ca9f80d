use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shift_guarantee::config::GuaranteeConfig;
use shift_guarantee::engine::estimator::validate_prediction_input;
use shift_guarantee::engine::{
    analyze_volatility, score_accuracy, AccuracyFilter, AccuracyReport, DateType,
    DemandForecaster, EarningsEstimator, EligibilityEvaluator, EligibilityResult,
    EligibilitySnapshot, GuaranteeOutcome, GuaranteeThreshold, Location, ShiftOptimizer,
    ShiftRecommendation, VolatilitySummary,
};
use shift_guarantee::error::AppError;
use shift_guarantee::import::{accuracy_samples, ShiftCsvImporter};
use shift_guarantee::ledger::{
    guarantee_router, AccountStatus, GuaranteeAuditLog, GuaranteeService, ShiftRepository,
};
use std::io::Cursor;
use std::sync::Arc;

/// Guarantee policy shared with the stateless engine endpoints.
pub(crate) type Policy = Arc<GuaranteeConfig>;

pub(crate) fn with_engine_routes<R, A>(
    service: Arc<GuaranteeService<R, A>>,
    policy: Policy,
) -> axum::Router
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    guarantee_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/predictions", axum::routing::post(prediction_endpoint))
        .route(
            "/api/v1/recommendations",
            axum::routing::post(recommendation_endpoint),
        )
        .route("/api/v1/guarantee/topup", axum::routing::post(topup_endpoint))
        .route(
            "/api/v1/eligibility/evaluate",
            axum::routing::post(eligibility_endpoint),
        )
        .route(
            "/api/v1/volatility/analyze",
            axum::routing::post(volatility_endpoint),
        )
        .route("/api/v1/accuracy/score", axum::routing::post(accuracy_endpoint))
        .layer(Extension(policy))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictionRequest {
    pub(crate) hour: u8,
    pub(crate) day_of_week: u8,
    pub(crate) location: Location,
    pub(crate) demand_level: f64,
    #[serde(default)]
    pub(crate) duration_hours: Option<u8>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionResponse {
    pub(crate) location: Location,
    pub(crate) hour: u8,
    pub(crate) day_of_week: u8,
    pub(crate) demand_level: f64,
    pub(crate) hourly_earnings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) shift_earnings: Option<f64>,
}

pub(crate) async fn prediction_endpoint(
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, AppError> {
    validate_prediction_input(request.hour, request.day_of_week, request.demand_level)?;
    let estimator = EarningsEstimator::standard();
    let hourly_earnings = estimator.predict(
        request.hour,
        request.day_of_week,
        request.location,
        request.demand_level,
    );
    let shift_earnings = request.duration_hours.map(|duration| {
        estimator.predict_shift(
            request.hour,
            request.day_of_week,
            duration,
            request.location,
            request.demand_level,
        )
    });

    Ok(Json(PredictionResponse {
        location: request.location,
        hour: request.hour,
        day_of_week: request.day_of_week,
        demand_level: request.demand_level,
        hourly_earnings,
        shift_earnings,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationRequest {
    pub(crate) location: Location,
    pub(crate) date_type: DateType,
    #[serde(default = "default_duration")]
    pub(crate) duration_hours: u8,
    #[serde(default = "default_top_n")]
    pub(crate) top_n: usize,
}

fn default_duration() -> u8 {
    4
}

fn default_top_n() -> usize {
    5
}

pub(crate) async fn recommendation_endpoint(
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<Vec<ShiftRecommendation>>, AppError> {
    let optimizer = ShiftOptimizer::new(EarningsEstimator::standard(), DemandForecaster::new());
    let picks = optimizer.recommend(
        request.location,
        request.date_type,
        request.duration_hours,
        request.top_n,
    )?;
    Ok(Json(picks))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopupRequest {
    pub(crate) predicted_earnings: f64,
    pub(crate) actual_earnings: f64,
    #[serde(default)]
    pub(crate) threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopupResponse {
    #[serde(flatten)]
    pub(crate) outcome: GuaranteeOutcome,
    pub(crate) activated: bool,
    pub(crate) protected_earnings: f64,
}

pub(crate) async fn topup_endpoint(
    Extension(policy): Extension<Policy>,
    Json(request): Json<TopupRequest>,
) -> Result<Json<TopupResponse>, AppError> {
    let threshold = match request.threshold {
        Some(ratio) => GuaranteeThreshold::new(ratio)?,
        None => policy.threshold,
    };
    let outcome =
        GuaranteeOutcome::evaluate(request.predicted_earnings, request.actual_earnings, threshold)?;

    Ok(Json(TopupResponse {
        activated: outcome.activated(),
        protected_earnings: outcome.protected_earnings(),
        outcome,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityRequest {
    #[serde(flatten)]
    pub(crate) snapshot: EligibilitySnapshot,
    #[serde(default)]
    pub(crate) account: AccountStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct EligibilityResponse {
    #[serde(flatten)]
    pub(crate) result: EligibilityResult,
    pub(crate) reason: String,
    /// False whenever the account is suspended, regardless of the metrics.
    pub(crate) honoured: bool,
}

pub(crate) async fn eligibility_endpoint(
    Extension(policy): Extension<Policy>,
    Json(request): Json<EligibilityRequest>,
) -> Result<Json<EligibilityResponse>, AppError> {
    request.snapshot.validate()?;
    let evaluator = EligibilityEvaluator::new(policy.eligibility.clone());
    let result = evaluator.evaluate(&request.snapshot);
    let honoured = result.is_eligible && request.account == AccountStatus::Active;

    Ok(Json(EligibilityResponse {
        reason: result.reason(),
        honoured,
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct VolatilityRequest {
    pub(crate) series_without: Vec<f64>,
    pub(crate) series_with: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VolatilityResponse {
    pub(crate) summary: VolatilitySummary,
    pub(crate) interpretation: String,
}

pub(crate) async fn volatility_endpoint(
    Json(request): Json<VolatilityRequest>,
) -> Result<Json<VolatilityResponse>, AppError> {
    let summary = analyze_volatility(&request.series_without, &request.series_with)?;
    Ok(Json(VolatilityResponse {
        interpretation: summary.interpretation(),
        summary,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccuracyRequest {
    /// `[predicted, actual]` pairs.
    #[serde(default)]
    pub(crate) pairs: Vec<(f64, f64)>,
    /// Inline shift history; takes precedence over `pairs` and honours the filter.
    #[serde(default)]
    pub(crate) shifts_csv: Option<String>,
    #[serde(flatten)]
    pub(crate) filter: AccuracyFilter,
}

pub(crate) async fn accuracy_endpoint(
    Json(request): Json<AccuracyRequest>,
) -> Result<Json<AccuracyReport>, AppError> {
    let report = match request.shifts_csv {
        Some(csv) => {
            let shifts = ShiftCsvImporter::from_reader(Cursor::new(csv.into_bytes()))?;
            request.filter.score(&accuracy_samples(&shifts))?
        }
        None => score_accuracy(&request.pairs)?,
    };
    Ok(Json(report))
}
