use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::repository::RepositoryError;
use crate::engine::{
    AccuracySample, EligibilitySnapshot, GuaranteeOutcome, GuaranteeThreshold, Location,
};

/// Identifier wrapper for committed shifts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShiftId(pub String);

/// Identifier wrapper for workers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Committed,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ShiftStatus::Committed => "committed",
            ShiftStatus::Completed => "completed",
            ShiftStatus::Cancelled => "cancelled",
        }
    }
}

/// Administrative standing. A suspended account is never honoured as eligible,
/// whatever its activity metrics say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Worker context captured when a shift is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStanding {
    pub snapshot: EligibilitySnapshot,
    #[serde(default)]
    pub account: AccountStatus,
}

/// Worker request to lock in a predicted shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCommitment {
    pub worker_id: WorkerId,
    pub location: Location,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub predicted_earnings: f64,
}

/// Append-only shift record. The prediction is fixed at commitment and the actual
/// earnings can be written exactly once, through [`ShiftEarningsRecord::settle`].
///
/// Records are only ever built by [`ShiftEarningsRecord::committed`]; there is no way to
/// materialise an already-settled record from a payload.
///
/// ```compile_fail
/// let _: shift_guarantee::ledger::ShiftEarningsRecord =
///     serde_json::from_str(r#"{"status":"completed","actual_earnings":1.0}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftEarningsRecord {
    pub id: ShiftId,
    pub worker_id: WorkerId,
    pub location: Location,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub predicted_earnings: f64,
    pub threshold: GuaranteeThreshold,
    pub guaranteed_minimum: f64,
    pub guarantee_eligible: bool,
    pub eligibility_reason: String,
    pub committed_at: DateTime<Utc>,
    actual_earnings: Option<f64>,
    status: ShiftStatus,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl ShiftEarningsRecord {
    pub fn committed(
        id: ShiftId,
        commitment: ShiftCommitment,
        threshold: GuaranteeThreshold,
        guarantee_eligible: bool,
        eligibility_reason: String,
        committed_at: DateTime<Utc>,
    ) -> Self {
        let ShiftCommitment {
            worker_id,
            location,
            starts_at,
            ends_at,
            predicted_earnings,
        } = commitment;

        Self {
            id,
            worker_id,
            location,
            starts_at,
            ends_at,
            predicted_earnings,
            threshold,
            guaranteed_minimum: threshold.guaranteed_minimum(predicted_earnings),
            guarantee_eligible,
            eligibility_reason,
            committed_at,
            actual_earnings: None,
            status: ShiftStatus::Committed,
            completed_at: None,
            cancelled_at: None,
        }
    }

    pub fn actual_earnings(&self) -> Option<f64> {
        self.actual_earnings
    }

    pub fn status(&self) -> ShiftStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Record the actual earnings. A second write, or a write to a cancelled shift,
    /// is rejected and leaves the record untouched.
    pub fn settle(&mut self, actual: f64, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        match self.status {
            ShiftStatus::Completed => Err(RepositoryError::AlreadySettled),
            ShiftStatus::Cancelled => Err(RepositoryError::NotCommitted),
            ShiftStatus::Committed => {
                self.actual_earnings = Some(actual);
                self.status = ShiftStatus::Completed;
                self.completed_at = Some(at);
                Ok(())
            }
        }
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        match self.status {
            ShiftStatus::Committed => {
                self.status = ShiftStatus::Cancelled;
                self.cancelled_at = Some(at);
                Ok(())
            }
            ShiftStatus::Completed => Err(RepositoryError::AlreadySettled),
            ShiftStatus::Cancelled => Err(RepositoryError::NotCommitted),
        }
    }

    /// Guarantee outcome once actual earnings are known.
    pub fn outcome(&self) -> Option<GuaranteeOutcome> {
        self.actual_earnings.and_then(|actual| {
            GuaranteeOutcome::evaluate(self.predicted_earnings, actual, self.threshold).ok()
        })
    }

    /// Top-up owed to the worker; zero when the shift was committed while ineligible.
    pub fn topup_paid(&self) -> f64 {
        match self.outcome() {
            Some(outcome) if self.guarantee_eligible => outcome.topup,
            _ => 0.0,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        let seconds = (self.ends_at - self.starts_at).num_seconds();
        seconds.max(0) as f64 / 3600.0
    }

    pub fn actual_hourly_rate(&self) -> Option<f64> {
        let hours = self.duration_hours();
        self.actual_earnings
            .filter(|_| hours > 0.0)
            .map(|actual| actual / hours)
    }

    pub fn start_hour(&self) -> u8 {
        self.starts_at.hour() as u8
    }

    pub fn accuracy_sample(&self) -> Option<AccuracySample> {
        self.actual_earnings.map(|actual| AccuracySample {
            predicted: self.predicted_earnings,
            actual,
            location: self.location,
            hour: self.start_hour(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(eligible: bool) -> ShiftEarningsRecord {
        let day = NaiveDate::from_ymd_opt(2025, 10, 3).expect("valid date");
        ShiftEarningsRecord::committed(
            ShiftId("shift-test".to_string()),
            ShiftCommitment {
                worker_id: WorkerId("w-1".to_string()),
                location: Location::Downtown,
                starts_at: day.and_hms_opt(17, 0, 0).expect("valid time"),
                ends_at: day.and_hms_opt(21, 0, 0).expect("valid time"),
                predicted_earnings: 100.0,
            },
            GuaranteeThreshold::default(),
            eligible,
            "all checks passed".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn actual_earnings_are_write_once() {
        let mut shift = record(true);
        shift.settle(80.0, Utc::now()).expect("first write");

        assert!(matches!(
            shift.settle(120.0, Utc::now()),
            Err(RepositoryError::AlreadySettled)
        ));
        assert_eq!(shift.actual_earnings(), Some(80.0));
        assert_eq!(shift.status(), ShiftStatus::Completed);
    }

    #[test]
    fn cancelled_shifts_cannot_be_settled() {
        let mut shift = record(true);
        shift.cancel(Utc::now()).expect("cancel");
        assert!(matches!(
            shift.settle(10.0, Utc::now()),
            Err(RepositoryError::NotCommitted)
        ));
        assert_eq!(shift.actual_earnings(), None);
    }

    #[test]
    fn topup_is_only_paid_when_eligible() {
        let mut eligible = record(true);
        eligible.settle(80.0, Utc::now()).expect("settle");
        assert!((eligible.topup_paid() - 10.0).abs() < 1e-9);

        let mut ineligible = record(false);
        ineligible.settle(80.0, Utc::now()).expect("settle");
        assert_eq!(ineligible.topup_paid(), 0.0);
        assert!(ineligible.outcome().expect("settled").activated());
    }

    #[test]
    fn derived_rates_use_the_shift_window() {
        let mut shift = record(true);
        assert_eq!(shift.duration_hours(), 4.0);
        assert_eq!(shift.actual_hourly_rate(), None);
        shift.settle(100.0, Utc::now()).expect("settle");
        assert_eq!(shift.actual_hourly_rate(), Some(25.0));
        assert_eq!(shift.start_hour(), 17);
    }
}
