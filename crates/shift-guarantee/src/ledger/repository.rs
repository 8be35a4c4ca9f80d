use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ShiftEarningsRecord, ShiftId, WorkerId};

/// Storage abstraction for committed shifts.
///
/// There is deliberately no general update: the only mutations are [`settle`] and
/// [`cancel`], and implementations must route them through the record's own guards so a
/// stored actual is never overwritten.
///
/// [`settle`]: ShiftRepository::settle
/// [`cancel`]: ShiftRepository::cancel
pub trait ShiftRepository: Send + Sync {
    fn insert(&self, record: ShiftEarningsRecord) -> Result<ShiftEarningsRecord, RepositoryError>;
    fn fetch(&self, id: &ShiftId) -> Result<Option<ShiftEarningsRecord>, RepositoryError>;
    fn settle(
        &self,
        id: &ShiftId,
        actual_earnings: f64,
        at: DateTime<Utc>,
    ) -> Result<ShiftEarningsRecord, RepositoryError>;
    fn cancel(&self, id: &ShiftId, at: DateTime<Utc>)
        -> Result<ShiftEarningsRecord, RepositoryError>;
    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<ShiftEarningsRecord>, RepositoryError>;
    fn completed(&self) -> Result<Vec<ShiftEarningsRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("actual earnings already recorded for this shift")]
    AlreadySettled,
    #[error("shift is no longer committed")]
    NotCommitted,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Audit trail for guarantee lifecycle events.
pub trait GuaranteeAuditLog: Send + Sync {
    fn publish(&self, event: GuaranteeEvent) -> Result<(), AuditError>;
    /// A worker's events, newest first, at most `limit` of them.
    fn history(&self, worker_id: &WorkerId, limit: usize)
        -> Result<Vec<GuaranteeEvent>, AuditError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuaranteeEventKind {
    Commitment,
    EarningsRecorded,
    GuaranteeActivated,
    Cancellation,
}

impl GuaranteeEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            GuaranteeEventKind::Commitment => "commitment",
            GuaranteeEventKind::EarningsRecorded => "earnings_recorded",
            GuaranteeEventKind::GuaranteeActivated => "guarantee_activated",
            GuaranteeEventKind::Cancellation => "cancellation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeEvent {
    pub kind: GuaranteeEventKind,
    pub shift_id: ShiftId,
    pub worker_id: WorkerId,
    pub recorded_at: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
}

impl GuaranteeEvent {
    pub fn for_record(
        kind: GuaranteeEventKind,
        record: &ShiftEarningsRecord,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let mut details = BTreeMap::new();
        details.insert(
            "predicted_earnings".to_string(),
            format!("{:.2}", record.predicted_earnings),
        );
        details.insert(
            "guaranteed_minimum".to_string(),
            format!("{:.2}", record.guaranteed_minimum),
        );
        details.insert(
            "guarantee_eligible".to_string(),
            record.guarantee_eligible.to_string(),
        );
        if let Some(actual) = record.actual_earnings() {
            details.insert("actual_earnings".to_string(), format!("{actual:.2}"));
            details.insert("topup_paid".to_string(), format!("{:.2}", record.topup_paid()));
        }

        Self {
            kind,
            shift_id: record.id.clone(),
            worker_id: record.worker_id.clone(),
            recorded_at,
            details,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}
