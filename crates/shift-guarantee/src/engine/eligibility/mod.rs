mod rules;
mod thresholds;

pub use thresholds::EligibilityThresholds;

use super::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Point-in-time activity aggregate for one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilitySnapshot {
    pub active_hours_week: f64,
    pub acceptance_rate: f64,
    pub cancellation_rate: f64,
    pub avg_rating: f64,
}

impl EligibilitySnapshot {
    pub fn new(
        active_hours_week: f64,
        acceptance_rate: f64,
        cancellation_rate: f64,
        avg_rating: f64,
    ) -> Result<Self, EngineError> {
        let snapshot = Self {
            active_hours_week,
            acceptance_rate,
            cancellation_rate,
            avg_rating,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Range check for snapshots that arrive through deserialization.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.active_hours_week.is_finite() && self.active_hours_week >= 0.0) {
            return Err(EngineError::invalid(
                "active_hours_week",
                format!("{} must be a finite value >= 0", self.active_hours_week),
            ));
        }
        ensure_within("acceptance_rate", self.acceptance_rate, 1.0)?;
        ensure_within("cancellation_rate", self.cancellation_rate, 1.0)?;
        ensure_within("avg_rating", self.avg_rating, 5.0)?;
        Ok(())
    }
}

fn ensure_within(field: &'static str, value: f64, upper: f64) -> Result<(), EngineError> {
    if (0.0..=upper).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::invalid(
            field,
            format!("{value} is outside [0, {upper}]"),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityCriterion {
    ActiveHours,
    Acceptance,
    Cancellation,
    Rating,
}

impl EligibilityCriterion {
    pub fn label(&self) -> &'static str {
        match self {
            EligibilityCriterion::ActiveHours => "Active hours per week",
            EligibilityCriterion::Acceptance => "Acceptance rate",
            EligibilityCriterion::Cancellation => "Cancellation rate",
            EligibilityCriterion::Rating => "Average rating",
        }
    }
}

/// Result of one criterion, with the raw value and its pass mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub pass: bool,
    pub value: f64,
    pub required: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub criteria: BTreeMap<EligibilityCriterion, CriterionOutcome>,
}

impl EligibilityResult {
    pub fn failed(&self) -> Vec<EligibilityCriterion> {
        self.criteria
            .iter()
            .filter(|(_, outcome)| !outcome.pass)
            .map(|(criterion, _)| *criterion)
            .collect()
    }

    pub fn reason(&self) -> String {
        let failed = self.failed();
        if failed.is_empty() {
            "all checks passed".to_string()
        } else {
            let labels: Vec<&str> = failed.iter().map(EligibilityCriterion::label).collect();
            format!("failed checks: {}", labels.join(", "))
        }
    }
}

/// Stateless evaluator; each criterion is checked independently and the results ANDed.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEvaluator {
    thresholds: EligibilityThresholds,
}

impl EligibilityEvaluator {
    pub fn new(thresholds: EligibilityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EligibilityThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, snapshot: &EligibilitySnapshot) -> EligibilityResult {
        let criteria: BTreeMap<_, _> = rules::check_criteria(snapshot, &self.thresholds)
            .into_iter()
            .collect();
        let is_eligible = criteria.values().all(|outcome| outcome.pass);

        debug!(is_eligible, "evaluated eligibility snapshot");
        EligibilityResult {
            is_eligible,
            criteria,
        }
    }
}
