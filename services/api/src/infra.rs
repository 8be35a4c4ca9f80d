use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use shift_guarantee::engine::{DateType, Location};
use shift_guarantee::ledger::{
    AuditError, GuaranteeAuditLog, GuaranteeEvent, RepositoryError, ShiftEarningsRecord, ShiftId,
    ShiftRepository, ShiftStatus, WorkerId,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryShiftRepository {
    records: Arc<Mutex<BTreeMap<ShiftId, ShiftEarningsRecord>>>,
}

impl InMemoryShiftRepository {
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<ShiftId, ShiftEarningsRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ShiftRepository for InMemoryShiftRepository {
    fn insert(&self, record: ShiftEarningsRecord) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ShiftId) -> Result<Option<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn settle(
        &self,
        id: &ShiftId,
        actual_earnings: f64,
        at: DateTime<Utc>,
    ) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.settle(actual_earnings, at)?;
        Ok(record.clone())
    }

    fn cancel(&self, id: &ShiftId, at: DateTime<Utc>) -> Result<ShiftEarningsRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.cancel(at)?;
        Ok(record.clone())
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|record| &record.worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn completed(&self) -> Result<Vec<ShiftEarningsRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|record| record.status() == ShiftStatus::Completed)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditLog {
    events: Arc<Mutex<Vec<GuaranteeEvent>>>,
}

impl GuaranteeAuditLog for InMemoryAuditLog {
    fn publish(&self, event: GuaranteeEvent) -> Result<(), AuditError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AuditError::Transport("audit mutex poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }

    fn history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<GuaranteeEvent>, AuditError> {
        let guard = self
            .events
            .lock()
            .map_err(|_| AuditError::Transport("audit mutex poisoned".to_string()))?;
        Ok(newest_first(&guard, worker_id, limit))
    }
}

/// Events are appended in the order they happen, so reverse order is newest first.
fn newest_first(
    events: &[GuaranteeEvent],
    worker_id: &WorkerId,
    limit: usize,
) -> Vec<GuaranteeEvent> {
    events
        .iter()
        .rev()
        .filter(|event| &event.worker_id == worker_id)
        .take(limit)
        .cloned()
        .collect()
}

impl InMemoryAuditLog {
    pub(crate) fn events(&self) -> Vec<GuaranteeEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

pub(crate) fn parse_location(raw: &str) -> Result<Location, String> {
    raw.parse::<Location>().map_err(|err| err.to_string())
}

pub(crate) fn parse_date_type(raw: &str) -> Result<DateType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "weekday" => Ok(DateType::Weekday),
        "friday" => Ok(DateType::Friday),
        "weekend" => Ok(DateType::Weekend),
        other => Err(format!(
            "unknown date type '{other}' (expected weekday, friday, or weekend)"
        )),
    }
}
