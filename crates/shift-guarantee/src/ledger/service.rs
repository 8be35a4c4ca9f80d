use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    AccountStatus, ShiftCommitment, ShiftEarningsRecord, ShiftId, ShiftStatus, WorkerId,
    WorkerStanding,
};
use super::report::{build_performance_report, PerformanceReport};
use super::repository::{
    AuditError, GuaranteeAuditLog, GuaranteeEvent, GuaranteeEventKind, RepositoryError,
    ShiftRepository,
};
use crate::config::GuaranteeConfig;
use crate::engine::{
    analyze_volatility, summarize_accuracy, AccuracyFilter, AccuracyReport, AccuracySample,
    AccuracySummary, EligibilityEvaluator, EngineError, GuaranteeOutcome, GuaranteeThreshold,
    VolatilitySummary,
};

/// Service composing the eligibility evaluator, the shift repository, and the audit log.
pub struct GuaranteeService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    evaluator: Arc<EligibilityEvaluator>,
    threshold: GuaranteeThreshold,
}

/// Audit entries returned when the caller does not ask for a specific number.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

static SHIFT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_shift_id() -> ShiftId {
    let id = SHIFT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ShiftId(format!("shift-{id:06}"))
}

/// Result of writing actual earnings to a committed shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftSettlement {
    pub record: ShiftEarningsRecord,
    pub outcome: GuaranteeOutcome,
    pub topup_paid: f64,
}

/// Per-worker roll-up over the ledger. Totals cover completed shifts only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeSummary {
    pub worker_id: WorkerId,
    pub committed_shifts: usize,
    pub completed_shifts: usize,
    pub cancelled_shifts: usize,
    pub guarantee_activations: usize,
    pub total_predicted: f64,
    pub total_actual: f64,
    pub total_guaranteed_minimum: f64,
    pub total_topup: f64,
    pub activation_rate_percent: f64,
    pub earnings_accuracy_percent: f64,
    pub income_improvement_percent: f64,
}

impl<R, A> GuaranteeService<R, A>
where
    R: ShiftRepository + 'static,
    A: GuaranteeAuditLog + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<A>, config: GuaranteeConfig) -> Self {
        Self {
            repository,
            audit,
            evaluator: Arc::new(EligibilityEvaluator::new(config.eligibility)),
            threshold: config.threshold,
        }
    }

    pub fn threshold(&self) -> GuaranteeThreshold {
        self.threshold
    }

    /// Lock in a predicted shift. Eligibility and the guaranteed minimum are fixed here
    /// and never recomputed.
    pub fn commit(
        &self,
        commitment: ShiftCommitment,
        standing: &WorkerStanding,
    ) -> Result<ShiftEarningsRecord, GuaranteeServiceError> {
        validate_commitment(&commitment)?;
        standing.snapshot.validate()?;

        let evaluation = self.evaluator.evaluate(&standing.snapshot);
        let (guarantee_eligible, reason) = match standing.account {
            AccountStatus::Suspended => (false, "account suspended".to_string()),
            AccountStatus::Active => (evaluation.is_eligible, evaluation.reason()),
        };
        if !guarantee_eligible {
            warn!(
                worker_id = %commitment.worker_id.0,
                reason = %reason,
                "shift committed without guarantee coverage"
            );
        }

        let now = Utc::now();
        let record = ShiftEarningsRecord::committed(
            next_shift_id(),
            commitment,
            self.threshold,
            guarantee_eligible,
            reason,
            now,
        );
        let stored = self.repository.insert(record)?;

        info!(
            shift_id = %stored.id.0,
            worker_id = %stored.worker_id.0,
            predicted = stored.predicted_earnings,
            guaranteed_minimum = stored.guaranteed_minimum,
            guarantee_eligible,
            "shift committed"
        );
        self.record_event(GuaranteeEvent::for_record(
            GuaranteeEventKind::Commitment,
            &stored,
            now,
        ));

        Ok(stored)
    }

    /// Write the actual earnings exactly once and report the guarantee outcome.
    pub fn record_actual_earnings(
        &self,
        shift_id: &ShiftId,
        actual_earnings: f64,
    ) -> Result<ShiftSettlement, GuaranteeServiceError> {
        let existing = self.get(shift_id)?;
        let outcome = GuaranteeOutcome::evaluate(
            existing.predicted_earnings,
            actual_earnings,
            existing.threshold,
        )?;

        let now = Utc::now();
        let record = self.repository.settle(shift_id, actual_earnings, now)?;
        let topup_paid = record.topup_paid();

        info!(
            shift_id = %record.id.0,
            actual = actual_earnings,
            topup_paid,
            "shift earnings recorded"
        );
        self.record_event(GuaranteeEvent::for_record(
            GuaranteeEventKind::EarningsRecorded,
            &record,
            now,
        ));

        if topup_paid > 0.0 {
            info!(
                shift_id = %record.id.0,
                worker_id = %record.worker_id.0,
                topup = topup_paid,
                "earnings guarantee activated"
            );
            self.record_event(GuaranteeEvent::for_record(
                GuaranteeEventKind::GuaranteeActivated,
                &record,
                now,
            ));
        }

        Ok(ShiftSettlement {
            record,
            outcome,
            topup_paid,
        })
    }

    pub fn cancel(&self, shift_id: &ShiftId) -> Result<ShiftEarningsRecord, GuaranteeServiceError> {
        let now = Utc::now();
        let record = self.repository.cancel(shift_id, now)?;

        info!(shift_id = %record.id.0, "shift cancelled");
        self.record_event(GuaranteeEvent::for_record(
            GuaranteeEventKind::Cancellation,
            &record,
            now,
        ));
        Ok(record)
    }

    /// Stored state is authoritative once the repository write succeeds; a lost audit
    /// event is logged and never turned into a failed call.
    fn record_event(&self, event: GuaranteeEvent) {
        let kind = event.kind;
        let shift_id = event.shift_id.0.clone();
        if let Err(error) = self.audit.publish(event) {
            warn!(
                shift_id = %shift_id,
                event = kind.label(),
                error = %error,
                "guarantee audit event not recorded"
            );
        }
    }

    pub fn get(&self, shift_id: &ShiftId) -> Result<ShiftEarningsRecord, GuaranteeServiceError> {
        let record = self
            .repository
            .fetch(shift_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn worker_summary(
        &self,
        worker_id: &WorkerId,
    ) -> Result<GuaranteeSummary, GuaranteeServiceError> {
        let records = self.repository.for_worker(worker_id)?;
        Ok(summarize_worker(worker_id, &records))
    }

    /// A worker's shifts, most recently committed first, optionally narrowed to one status.
    pub fn worker_shifts(
        &self,
        worker_id: &WorkerId,
        status: Option<ShiftStatus>,
    ) -> Result<Vec<ShiftEarningsRecord>, GuaranteeServiceError> {
        let mut records = self.repository.for_worker(worker_id)?;
        if let Some(status) = status {
            records.retain(|record| record.status() == status);
        }
        records.sort_by(|a, b| {
            b.committed_at
                .cmp(&a.committed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    pub fn guarantee_history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<GuaranteeEvent>, GuaranteeServiceError> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(EngineError::InvalidInput {
                field: "limit",
                reason: format!("{limit} must be between 1 and {MAX_HISTORY_LIMIT}"),
            }
            .into());
        }
        Ok(self.audit.history(worker_id, limit)?)
    }

    pub fn performance_report(
        &self,
        worker_id: &WorkerId,
    ) -> Result<PerformanceReport, GuaranteeServiceError> {
        let records = self.repository.for_worker(worker_id)?;
        Ok(build_performance_report(worker_id, &records))
    }

    /// Volatility of the worker's completed shifts: raw actuals against actuals plus the
    /// top-up actually paid.
    pub fn worker_volatility(
        &self,
        worker_id: &WorkerId,
    ) -> Result<VolatilitySummary, GuaranteeServiceError> {
        let completed: Vec<ShiftEarningsRecord> = self
            .repository
            .for_worker(worker_id)?
            .into_iter()
            .filter(|record| record.status() == ShiftStatus::Completed)
            .collect();

        let (without, with): (Vec<f64>, Vec<f64>) = completed
            .iter()
            .filter_map(|record| {
                record
                    .actual_earnings()
                    .map(|actual| (actual, actual + record.topup_paid()))
            })
            .unzip();

        Ok(analyze_volatility(&without, &with)?)
    }

    pub fn prediction_accuracy(
        &self,
        filter: &AccuracyFilter,
    ) -> Result<AccuracyReport, GuaranteeServiceError> {
        let samples = self.accuracy_samples()?;
        Ok(filter.score(&samples)?)
    }

    pub fn accuracy_summary(&self) -> Result<AccuracySummary, GuaranteeServiceError> {
        let samples = self.accuracy_samples()?;
        Ok(summarize_accuracy(&samples)?)
    }

    fn accuracy_samples(&self) -> Result<Vec<AccuracySample>, GuaranteeServiceError> {
        Ok(self
            .repository
            .completed()?
            .iter()
            .filter_map(ShiftEarningsRecord::accuracy_sample)
            .collect())
    }
}

fn validate_commitment(commitment: &ShiftCommitment) -> Result<(), EngineError> {
    let predicted = commitment.predicted_earnings;
    if !predicted.is_finite() || predicted < 0.0 {
        return Err(EngineError::InvalidInput {
            field: "predicted_earnings",
            reason: format!("{predicted} must be a finite, non-negative amount"),
        });
    }
    if commitment.ends_at <= commitment.starts_at {
        return Err(EngineError::InvalidInput {
            field: "ends_at",
            reason: "shift must end after it starts".to_string(),
        });
    }
    if commitment.worker_id.0.trim().is_empty() {
        return Err(EngineError::InvalidInput {
            field: "worker_id",
            reason: "worker id must not be blank".to_string(),
        });
    }
    Ok(())
}

fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

pub(crate) fn summarize_worker(
    worker_id: &WorkerId,
    records: &[ShiftEarningsRecord],
) -> GuaranteeSummary {
    let count = |status: ShiftStatus| {
        records
            .iter()
            .filter(|record| record.status() == status)
            .count()
    };
    let completed: Vec<&ShiftEarningsRecord> = records
        .iter()
        .filter(|record| record.status() == ShiftStatus::Completed)
        .collect();

    let total_predicted: f64 = completed.iter().map(|r| r.predicted_earnings).sum();
    let total_actual: f64 = completed.iter().filter_map(|r| r.actual_earnings()).sum();
    let total_guaranteed_minimum: f64 = completed.iter().map(|r| r.guaranteed_minimum).sum();
    let total_topup: f64 = completed.iter().map(|r| r.topup_paid()).sum();
    let guarantee_activations = completed.iter().filter(|r| r.topup_paid() > 0.0).count();

    GuaranteeSummary {
        worker_id: worker_id.clone(),
        committed_shifts: count(ShiftStatus::Committed),
        completed_shifts: completed.len(),
        cancelled_shifts: count(ShiftStatus::Cancelled),
        guarantee_activations,
        total_predicted,
        total_actual,
        total_guaranteed_minimum,
        total_topup,
        activation_rate_percent: percent(guarantee_activations as f64, completed.len() as f64),
        earnings_accuracy_percent: percent(total_actual, total_predicted),
        income_improvement_percent: percent(total_topup, total_actual),
    }
}

/// Error raised by the guarantee service.
#[derive(Debug, thiserror::Error)]
pub enum GuaranteeServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}
