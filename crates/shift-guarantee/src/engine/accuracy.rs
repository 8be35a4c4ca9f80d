//! Prediction accuracy over paired `(predicted, actual)` samples.
//!
//! Pairs whose actual value is zero cannot contribute a percentage error, so they are
//! left out of MAPE while still counting toward MAE, RMSE, and R². When no pair has a
//! non-zero actual, MAPE (and therefore the accuracy level) is undefined.

use super::estimator::Location;
use super::{ensure_earnings, mean, EngineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Quality bands keyed on MAPE. Upper bounds are inclusive and checked in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccuracyLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

const ACCURACY_BANDS: [(f64, AccuracyLevel); 3] = [
    (10.0, AccuracyLevel::Excellent),
    (15.0, AccuracyLevel::Good),
    (20.0, AccuracyLevel::Acceptable),
];

/// MAPE ceiling for a model to be considered fit for guarantee pricing.
pub const MINIMUM_ACCEPTABLE_MAPE: f64 = 20.0;

impl AccuracyLevel {
    pub fn from_mape(mape: f64) -> Self {
        ACCURACY_BANDS
            .iter()
            .find(|(ceiling, _)| mape <= *ceiling)
            .map(|(_, level)| *level)
            .unwrap_or(AccuracyLevel::Poor)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccuracyLevel::Excellent => "Excellent",
            AccuracyLevel::Good => "Good",
            AccuracyLevel::Acceptable => "Acceptable",
            AccuracyLevel::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub sample_size: usize,
    /// Pairs that contributed to MAPE (non-zero actuals).
    pub mape_sample_size: usize,
    pub mape: Option<f64>,
    pub mae: f64,
    pub rmse: f64,
    /// `None` when every actual is identical.
    pub r2: Option<f64>,
    pub mean_prediction: f64,
    pub mean_actual: f64,
    pub accuracy_level: Option<AccuracyLevel>,
}

pub fn score_accuracy(pairs: &[(f64, f64)]) -> Result<AccuracyReport, EngineError> {
    if pairs.is_empty() {
        return Err(EngineError::InsufficientData {
            required: 1,
            found: 0,
        });
    }
    for (predicted, actual) in pairs {
        ensure_earnings("predicted_earnings", *predicted)?;
        ensure_earnings("actual_earnings", *actual)?;
    }

    let n = pairs.len() as f64;
    let predictions: Vec<f64> = pairs.iter().map(|(predicted, _)| *predicted).collect();
    let actuals: Vec<f64> = pairs.iter().map(|(_, actual)| *actual).collect();
    let mean_actual = mean(&actuals);

    let mae = pairs
        .iter()
        .map(|(predicted, actual)| (actual - predicted).abs())
        .sum::<f64>()
        / n;

    let ss_res: f64 = pairs
        .iter()
        .map(|(predicted, actual)| (actual - predicted).powi(2))
        .sum();
    let rmse = (ss_res / n).sqrt();

    let ss_tot: f64 = actuals
        .iter()
        .map(|actual| (actual - mean_actual).powi(2))
        .sum();
    let r2 = (ss_tot != 0.0).then(|| 1.0 - ss_res / ss_tot);

    let percentage_errors: Vec<f64> = pairs
        .iter()
        .filter(|(_, actual)| *actual != 0.0)
        .map(|(predicted, actual)| (actual - predicted).abs() / actual * 100.0)
        .collect();
    let mape = (!percentage_errors.is_empty()).then(|| mean(&percentage_errors));

    debug!(samples = pairs.len(), ?mape, "scored prediction accuracy");

    Ok(AccuracyReport {
        sample_size: pairs.len(),
        mape_sample_size: percentage_errors.len(),
        mape,
        mae,
        rmse,
        r2,
        mean_prediction: mean(&predictions),
        mean_actual,
        accuracy_level: mape.map(AccuracyLevel::from_mape),
    })
}

/// A settled prediction tagged with the keys accuracy is commonly sliced by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySample {
    pub predicted: f64,
    pub actual: f64,
    pub location: Location,
    pub hour: u8,
}

/// Optional location/hour restriction applied before scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyFilter {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub hour: Option<u8>,
}

impl AccuracyFilter {
    pub fn matches(&self, sample: &AccuracySample) -> bool {
        self.location.map_or(true, |location| location == sample.location)
            && self.hour.map_or(true, |hour| hour == sample.hour)
    }

    pub fn describe(&self) -> String {
        let location = self.location.map_or("all".to_string(), |l| l.key().to_string());
        let hour = self.hour.map_or("all".to_string(), |h| h.to_string());
        format!("location={location}, hour={hour}")
    }

    pub fn score(&self, samples: &[AccuracySample]) -> Result<AccuracyReport, EngineError> {
        let pairs: Vec<(f64, f64)> = samples
            .iter()
            .filter(|sample| self.matches(sample))
            .map(|sample| (sample.predicted, sample.actual))
            .collect();
        score_accuracy(&pairs)
    }
}

/// Partition by `key` and score each group. Groups that cannot be scored are left out.
pub fn score_grouped<K, F>(samples: &[AccuracySample], key: F) -> BTreeMap<K, AccuracyReport>
where
    K: Ord,
    F: Fn(&AccuracySample) -> K,
{
    let mut groups: BTreeMap<K, Vec<(f64, f64)>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(key(sample))
            .or_default()
            .push((sample.predicted, sample.actual));
    }

    groups
        .into_iter()
        .filter_map(|(group, pairs)| score_accuracy(&pairs).ok().map(|report| (group, report)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub overall: AccuracyReport,
    pub by_location: BTreeMap<Location, AccuracyReport>,
    pub by_hour: BTreeMap<u8, AccuracyReport>,
    pub meets_minimum_threshold: bool,
}

pub fn summarize_accuracy(samples: &[AccuracySample]) -> Result<AccuracySummary, EngineError> {
    let overall = AccuracyFilter::default().score(samples)?;
    let meets_minimum_threshold = overall
        .mape
        .map_or(false, |mape| mape <= MINIMUM_ACCEPTABLE_MAPE);

    Ok(AccuracySummary {
        by_location: score_grouped(samples, |sample| sample.location),
        by_hour: score_grouped(samples, |sample| sample.hour),
        overall,
        meets_minimum_threshold,
    })
}
