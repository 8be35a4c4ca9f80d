use super::estimator::{EarningsEstimator, Location};
use super::forecast::DemandForecaster;
use super::EngineError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Representative calendar day used when scanning start hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    Weekday,
    Friday,
    Weekend,
}

impl DateType {
    /// Day of week (Monday = 0) standing in for the date type.
    pub fn representative_day(&self) -> u8 {
        match self {
            DateType::Weekday => 2,
            DateType::Friday => 4,
            DateType::Weekend => 5,
        }
    }
}

/// Candidate shift window with its summed hourly prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecommendation {
    pub start_hour: u8,
    pub duration_hours: u8,
    pub location: Location,
    pub predicted_earnings: f64,
    /// Forecast demand at the start hour.
    pub demand_level: f64,
}

/// Exhaustive scan over the 24 possible start hours.
#[derive(Debug, Clone, Default)]
pub struct ShiftOptimizer {
    estimator: EarningsEstimator,
    forecaster: DemandForecaster,
}

impl ShiftOptimizer {
    pub fn new(estimator: EarningsEstimator, forecaster: DemandForecaster) -> Self {
        Self {
            estimator,
            forecaster,
        }
    }

    pub fn recommend(
        &self,
        location: Location,
        date_type: DateType,
        duration_hours: u8,
        top_n: usize,
    ) -> Result<Vec<ShiftRecommendation>, EngineError> {
        if !(1..=24).contains(&duration_hours) {
            return Err(EngineError::invalid(
                "duration_hours",
                format!("{duration_hours} is outside 1..=24"),
            ));
        }

        let day = date_type.representative_day();
        let mut windows: Vec<ShiftRecommendation> = (0..24u8)
            .map(|start_hour| {
                let predicted_earnings = (0..duration_hours)
                    .map(|offset| {
                        let hour = (start_hour + offset) % 24;
                        let demand = self.forecaster.forecast(location, hour);
                        self.estimator.predict(hour, day, location, demand)
                    })
                    .sum();

                ShiftRecommendation {
                    start_hour,
                    duration_hours,
                    location,
                    predicted_earnings,
                    demand_level: self.forecaster.forecast(location, start_hour),
                }
            })
            .collect();

        windows.sort_by(|a, b| {
            b.predicted_earnings
                .total_cmp(&a.predicted_earnings)
                .then(a.start_hour.cmp(&b.start_hour))
        });
        windows.truncate(top_n);

        debug!(%location, ?date_type, duration_hours, returned = windows.len(), "ranked shift windows");
        Ok(windows)
    }
}
