use serde::{Deserialize, Serialize};

/// Pass marks for each eligibility criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityThresholds {
    pub min_active_hours_week: f64,
    pub min_acceptance_rate: f64,
    pub max_cancellation_rate: f64,
    pub min_avg_rating: f64,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            min_active_hours_week: 20.0,
            min_acceptance_rate: 0.95,
            max_cancellation_rate: 0.05,
            min_avg_rating: 4.0,
        }
    }
}
