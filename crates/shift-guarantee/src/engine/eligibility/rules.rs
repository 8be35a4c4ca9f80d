use super::thresholds::EligibilityThresholds;
use super::{CriterionOutcome, EligibilityCriterion, EligibilitySnapshot};

pub(crate) fn check_criteria(
    snapshot: &EligibilitySnapshot,
    thresholds: &EligibilityThresholds,
) -> Vec<(EligibilityCriterion, CriterionOutcome)> {
    vec![
        (
            EligibilityCriterion::ActiveHours,
            at_least(
                snapshot.active_hours_week,
                thresholds.min_active_hours_week,
            ),
        ),
        (
            EligibilityCriterion::Acceptance,
            at_least(snapshot.acceptance_rate, thresholds.min_acceptance_rate),
        ),
        (
            EligibilityCriterion::Cancellation,
            at_most(snapshot.cancellation_rate, thresholds.max_cancellation_rate),
        ),
        (
            EligibilityCriterion::Rating,
            at_least(snapshot.avg_rating, thresholds.min_avg_rating),
        ),
    ]
}

fn at_least(value: f64, required: f64) -> CriterionOutcome {
    CriterionOutcome {
        pass: value >= required,
        value,
        required,
    }
}

fn at_most(value: f64, required: f64) -> CriterionOutcome {
    CriterionOutcome {
        pass: value <= required,
        value,
        required,
    }
}
