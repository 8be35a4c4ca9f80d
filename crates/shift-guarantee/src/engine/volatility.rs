//! Dispersion statistics over earnings series, with and without the guarantee applied.
//!
//! Conventions:
//! - standard deviation is the *sample* deviation (n - 1 denominator), since a worker's
//!   shifts are observations rather than a full population;
//! - quartiles use linear interpolation between closest ranks, `rank = p * (n - 1)`;
//! - the coefficient of variation is `std / mean * 100` and is `None` when the mean is 0;
//! - reductions are `(without - with) / without * 100`, `None` when the baseline is 0,
//!   undefined, or non-finite. Negative reductions are reported as-is.

use super::{ensure_earnings, mean, EngineError};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_VOLATILITY_SAMPLES: usize = 2;

/// Descriptive statistics for one earnings series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub sample_size: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub variance: f64,
    /// `None` when the mean is zero.
    pub cv: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl SeriesStatistics {
    pub fn from_series(field: &'static str, series: &[f64]) -> Result<Self, EngineError> {
        if series.len() < MIN_VOLATILITY_SAMPLES {
            return Err(EngineError::InsufficientData {
                required: MIN_VOLATILITY_SAMPLES,
                found: series.len(),
            });
        }
        for value in series {
            ensure_earnings(field, *value)?;
        }

        let n = series.len();
        let mut sorted = series.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = mean(series);
        let variance = series
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        let std_dev = variance.sqrt();
        let cv = (mean != 0.0).then(|| std_dev / mean * 100.0);

        let min = sorted[0];
        let max = sorted[n - 1];
        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);

        Ok(Self {
            sample_size: n,
            mean,
            std_dev,
            variance,
            cv,
            min,
            max,
            range: max - min,
            median,
            q1,
            q3,
            iqr: q3 - q1,
        })
    }
}

/// Linear interpolation between closest ranks over an ascending, non-empty slice.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = lower + 1;
    if upper >= sorted.len() {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySummary {
    pub without_guarantee: SeriesStatistics,
    pub with_guarantee: SeriesStatistics,
    /// Relative drop in the coefficient of variation; may be negative.
    pub volatility_reduction_percent: Option<f64>,
    pub std_dev_reduction_percent: Option<f64>,
    pub earnings_floor_without: f64,
    pub earnings_floor_with: f64,
}

impl VolatilitySummary {
    pub fn interpretation(&self) -> String {
        match self.volatility_reduction_percent {
            Some(reduction) if reduction >= 0.0 => format!(
                "guarantee reduced earnings volatility by {:.1}% and raised the floor from {:.2} to {:.2}",
                reduction, self.earnings_floor_without, self.earnings_floor_with
            ),
            Some(reduction) => format!(
                "guarantee increased earnings volatility by {:.1}%",
                reduction.abs()
            ),
            None => "volatility change undefined: baseline series has no variation".to_string(),
        }
    }
}

pub fn analyze_volatility(
    series_without: &[f64],
    series_with: &[f64],
) -> Result<VolatilitySummary, EngineError> {
    let without = SeriesStatistics::from_series("series_without", series_without)?;
    let with = SeriesStatistics::from_series("series_with", series_with)?;

    let volatility_reduction_percent = without
        .cv
        .zip(with.cv)
        .and_then(|(cv_without, cv_with)| reduction_percent(cv_without, cv_with));
    let std_dev_reduction_percent = reduction_percent(without.std_dev, with.std_dev);

    debug!(
        samples_without = without.sample_size,
        samples_with = with.sample_size,
        ?volatility_reduction_percent,
        "analyzed earnings volatility"
    );

    Ok(VolatilitySummary {
        earnings_floor_without: without.min,
        earnings_floor_with: with.min,
        without_guarantee: without,
        with_guarantee: with,
        volatility_reduction_percent,
        std_dev_reduction_percent,
    })
}

fn reduction_percent(baseline: f64, treated: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !treated.is_finite() {
        return None;
    }
    Some((baseline - treated) / baseline * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uses_sample_standard_deviation() {
        let stats = SeriesStatistics::from_series("series", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .expect("valid series");
        assert_abs_diff_eq!(stats.mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.variance, 32.0 / 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std_dev, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(stats.cv.expect("defined"), (32.0f64 / 7.0).sqrt() / 5.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let stats = SeriesStatistics::from_series("series", &[40.0, 10.0, 30.0, 20.0])
            .expect("valid series");
        assert_abs_diff_eq!(stats.q1, 17.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.median, 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.q3, 32.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.iqr, 15.0, epsilon = 1e-12);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.range, 30.0);
    }

    #[test]
    fn zero_variance_yields_zero_cv_and_undefined_reduction() {
        let summary = analyze_volatility(&[100.0, 100.0, 100.0], &[100.0, 100.0, 100.0])
            .expect("valid series");
        assert_eq!(summary.without_guarantee.std_dev, 0.0);
        assert_eq!(summary.without_guarantee.cv, Some(0.0));
        assert_eq!(summary.volatility_reduction_percent, None);
        assert_eq!(summary.std_dev_reduction_percent, None);
    }

    #[test]
    fn zero_mean_leaves_cv_undefined() {
        let stats = SeriesStatistics::from_series("series", &[0.0, 0.0]).expect("valid series");
        assert_eq!(stats.cv, None);
    }

    #[test]
    fn guarantee_that_lifts_the_floor_reduces_volatility() {
        let without = [40.0, 100.0, 120.0, 60.0];
        let with = [81.0, 100.0, 120.0, 81.0];
        let summary = analyze_volatility(&without, &with).expect("valid series");

        let reduction = summary.volatility_reduction_percent.expect("defined");
        assert!(reduction > 0.0);
        assert_eq!(summary.earnings_floor_without, 40.0);
        assert_eq!(summary.earnings_floor_with, 81.0);
        assert!(summary.interpretation().starts_with("guarantee reduced"));
    }

    #[test]
    fn uneven_topups_can_increase_volatility() {
        let without = [100.0, 101.0, 99.0, 100.0];
        let with = [100.0, 130.0, 99.0, 100.0];
        let summary = analyze_volatility(&without, &with).expect("valid series");

        let reduction = summary.volatility_reduction_percent.expect("defined");
        assert!(reduction < 0.0, "negative reduction is reported, got {reduction}");
    }

    #[test]
    fn short_series_report_insufficient_data() {
        assert_eq!(
            analyze_volatility(&[10.0], &[10.0, 12.0]),
            Err(EngineError::InsufficientData { required: 2, found: 1 })
        );
        assert_eq!(
            analyze_volatility(&[10.0, 12.0], &[]),
            Err(EngineError::InsufficientData { required: 2, found: 0 })
        );
    }

    #[test]
    fn negative_or_non_finite_earnings_are_invalid() {
        assert!(matches!(
            analyze_volatility(&[10.0, -1.0], &[10.0, 12.0]),
            Err(EngineError::InvalidInput { field: "series_without", .. })
        ));
        assert!(matches!(
            analyze_volatility(&[10.0, 11.0], &[f64::INFINITY, 12.0]),
            Err(EngineError::InvalidInput { field: "series_with", .. })
        ));
    }
}
