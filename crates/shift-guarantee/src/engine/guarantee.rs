use super::{ensure_earnings, EngineError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GUARANTEE_THRESHOLD: f64 = 0.90;

/// Share of predicted earnings a worker is guaranteed. Always within `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct GuaranteeThreshold(f64);

impl GuaranteeThreshold {
    pub fn new(ratio: f64) -> Result<Self, EngineError> {
        if ratio.is_finite() && ratio > 0.0 && ratio <= 1.0 {
            Ok(Self(ratio))
        } else {
            Err(EngineError::invalid(
                "threshold",
                format!("{ratio} is outside (0, 1]"),
            ))
        }
    }

    pub fn ratio(&self) -> f64 {
        self.0
    }

    pub fn guaranteed_minimum(&self, predicted: f64) -> f64 {
        predicted * self.0
    }
}

impl Default for GuaranteeThreshold {
    fn default() -> Self {
        Self(DEFAULT_GUARANTEE_THRESHOLD)
    }
}

impl TryFrom<f64> for GuaranteeThreshold {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GuaranteeThreshold> for f64 {
    fn from(value: GuaranteeThreshold) -> Self {
        value.0
    }
}

/// `max(0, predicted * threshold - actual)`.
pub fn compute_topup(predicted: f64, actual: f64, threshold: f64) -> Result<f64, EngineError> {
    let threshold = GuaranteeThreshold::new(threshold)?;
    Ok(GuaranteeOutcome::evaluate(predicted, actual, threshold)?.topup)
}

/// Derived view of a settled shift; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeOutcome {
    pub predicted_earnings: f64,
    pub actual_earnings: f64,
    pub threshold: GuaranteeThreshold,
    pub guaranteed_minimum: f64,
    pub topup: f64,
}

impl GuaranteeOutcome {
    pub fn evaluate(
        predicted: f64,
        actual: f64,
        threshold: GuaranteeThreshold,
    ) -> Result<Self, EngineError> {
        let predicted = ensure_earnings("predicted_earnings", predicted)?;
        let actual = ensure_earnings("actual_earnings", actual)?;
        let guaranteed_minimum = threshold.guaranteed_minimum(predicted);
        let topup = (guaranteed_minimum - actual).max(0.0);

        Ok(Self {
            predicted_earnings: predicted,
            actual_earnings: actual,
            threshold,
            guaranteed_minimum,
            topup,
        })
    }

    /// True when the worker needed a top-up to reach the guaranteed minimum.
    pub fn activated(&self) -> bool {
        self.topup > 0.0
    }

    pub fn protected_earnings(&self) -> f64 {
        self.actual_earnings + self.topup
    }
}
