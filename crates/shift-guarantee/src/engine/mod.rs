//! Pure, stateless calculations shared by the ledger, the CLI, and the HTTP surface.
//!
//! Every entry point validates its inputs and reports [`EngineError`] synchronously.
//! Metrics that are undefined for degenerate input (a coefficient of variation over a
//! zero mean, R² over constant actuals) are returned as `None` rather than as an error
//! or a substituted zero.

pub mod accuracy;
pub mod eligibility;
pub mod estimator;
pub mod forecast;
pub mod guarantee;
pub mod optimizer;
pub mod volatility;

pub use accuracy::{
    score_accuracy, score_grouped, summarize_accuracy, AccuracyFilter, AccuracyLevel,
    AccuracyReport, AccuracySample, AccuracySummary,
};
pub use eligibility::{
    CriterionOutcome, EligibilityCriterion, EligibilityEvaluator, EligibilityResult,
    EligibilitySnapshot, EligibilityThresholds,
};
pub use estimator::{DayType, EarningsEstimator, Location, RateCard};
pub use forecast::DemandForecaster;
pub use guarantee::{compute_topup, GuaranteeOutcome, GuaranteeThreshold};
pub use optimizer::{DateType, ShiftOptimizer, ShiftRecommendation};
pub use volatility::{analyze_volatility, SeriesStatistics, VolatilitySummary};

/// Validation failures raised by the engine before any computation happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("insufficient data: at least {required} sample(s) required, found {found}")]
    InsufficientData { required: usize, found: usize },
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects NaN, infinities, and negative amounts.
pub(crate) fn ensure_earnings(field: &'static str, value: f64) -> Result<f64, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::invalid(field, format!("{value} is not a finite amount")));
    }
    if value < 0.0 {
        return Err(EngineError::invalid(
            field,
            format!("{value} is negative; earnings must be >= 0"),
        ));
    }
    Ok(value)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
