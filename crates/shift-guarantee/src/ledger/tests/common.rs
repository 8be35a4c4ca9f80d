use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::config::GuaranteeConfig;
use crate::engine::{EligibilitySnapshot, Location};
use crate::ledger::domain::{
    AccountStatus, ShiftCommitment, ShiftEarningsRecord, ShiftId, ShiftStatus, WorkerId,
    WorkerStanding,
};
use crate::ledger::repository::{
    AuditError, GuaranteeAuditLog, GuaranteeEvent, RepositoryError, ShiftRepository,
};
use crate::ledger::service::GuaranteeService;

pub(super) fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .expect("valid date")
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

pub(super) fn commitment(worker: &str, predicted: f64) -> ShiftCommitment {
    ShiftCommitment {
        worker_id: WorkerId(worker.to_string()),
        location: Location::Downtown,
        starts_at: at(3, 17),
        ends_at: at(3, 21),
        predicted_earnings: predicted,
    }
}

pub(super) fn shift_at(
    worker: &str,
    location: Location,
    day: u32,
    hours: (u32, u32),
    predicted: f64,
) -> ShiftCommitment {
    ShiftCommitment {
        worker_id: WorkerId(worker.to_string()),
        location,
        starts_at: at(day, hours.0),
        ends_at: at(day, hours.1),
        predicted_earnings: predicted,
    }
}

pub(super) fn good_standing() -> WorkerStanding {
    WorkerStanding {
        snapshot: EligibilitySnapshot {
            active_hours_week: 25.0,
            acceptance_rate: 0.97,
            cancellation_rate: 0.03,
            avg_rating: 4.6,
        },
        account: AccountStatus::Active,
    }
}

pub(super) fn poor_standing() -> WorkerStanding {
    WorkerStanding {
        snapshot: EligibilitySnapshot {
            active_hours_week: 15.0,
            acceptance_rate: 0.90,
            cancellation_rate: 0.08,
            avg_rating: 3.8,
        },
        account: AccountStatus::Active,
    }
}

pub(super) fn build_service() -> (
    GuaranteeService<MemoryRepository, MemoryAudit>,
    Arc<MemoryRepository>,
    Arc<MemoryAudit>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let audit = Arc::new(MemoryAudit::default());
    let service =
        GuaranteeService::new(repository.clone(), audit.clone(), GuaranteeConfig::default());
    (service, repository, audit)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ShiftId, ShiftEarningsRecord>>>,
}

impl ShiftRepository for MemoryRepository {
    fn insert(&self, record: ShiftEarningsRecord) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ShiftId) -> Result<Option<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn settle(
        &self,
        id: &ShiftId,
        actual_earnings: f64,
        at: DateTime<Utc>,
    ) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.settle(actual_earnings, at)?;
        Ok(record.clone())
    }

    fn cancel(&self, id: &ShiftId, at: DateTime<Utc>) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.cancel(at)?;
        Ok(record.clone())
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn completed(&self) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status() == ShiftStatus::Completed)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    events: Arc<Mutex<Vec<GuaranteeEvent>>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<GuaranteeEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl GuaranteeAuditLog for MemoryAudit {
    fn publish(&self, event: GuaranteeEvent) -> Result<(), AuditError> {
        self.events.lock().expect("audit mutex poisoned").push(event);
        Ok(())
    }

    fn history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<GuaranteeEvent>, AuditError> {
        Ok(self
            .events()
            .into_iter()
            .rev()
            .filter(|event| &event.worker_id == worker_id)
            .take(limit)
            .collect())
    }
}

/// Audit log that accepts the first `accepted` events and then loses its transport.
pub(super) struct FlakyAudit {
    accepted: usize,
    inner: MemoryAudit,
}

impl FlakyAudit {
    pub(super) fn accepting(accepted: usize) -> Self {
        Self {
            accepted,
            inner: MemoryAudit::default(),
        }
    }

    pub(super) fn events(&self) -> Vec<GuaranteeEvent> {
        self.inner.events()
    }
}

impl GuaranteeAuditLog for FlakyAudit {
    fn publish(&self, event: GuaranteeEvent) -> Result<(), AuditError> {
        if self.inner.events().len() >= self.accepted {
            return Err(AuditError::Transport("down".to_string()));
        }
        self.inner.publish(event)
    }

    fn history(
        &self,
        _worker_id: &WorkerId,
        _limit: usize,
    ) -> Result<Vec<GuaranteeEvent>, AuditError> {
        Err(AuditError::Transport("down".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ShiftRepository for UnavailableRepository {
    fn insert(&self, _record: ShiftEarningsRecord) -> Result<ShiftEarningsRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &ShiftId) -> Result<Option<ShiftEarningsRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn settle(
        &self,
        _id: &ShiftId,
        _actual_earnings: f64,
        _at: DateTime<Utc>,
    ) -> Result<ShiftEarningsRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn cancel(&self, _id: &ShiftId, _at: DateTime<Utc>) -> Result<ShiftEarningsRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn for_worker(&self, _worker_id: &WorkerId) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn completed(&self) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
