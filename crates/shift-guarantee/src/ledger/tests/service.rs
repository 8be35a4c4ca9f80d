use super::common::*;
use approx::assert_abs_diff_eq;
use std::sync::Arc;

use crate::config::GuaranteeConfig;
use crate::engine::{AccuracyFilter, EngineError, Location};
use crate::ledger::domain::{AccountStatus, ShiftCommitment, ShiftId, ShiftStatus, WorkerId};
use crate::ledger::repository::{GuaranteeEventKind, RepositoryError};
use crate::ledger::service::{GuaranteeService, GuaranteeServiceError};

#[test]
fn commit_fixes_the_guaranteed_minimum_and_eligibility() {
    let (service, repository, audit) = build_service();

    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");

    assert!(record.id.0.starts_with("shift-"));
    assert_eq!(record.status(), ShiftStatus::Committed);
    assert!(record.guarantee_eligible);
    assert_abs_diff_eq!(record.guaranteed_minimum, 90.0, epsilon = 1e-9);
    assert_eq!(record.actual_earnings(), None);
    assert!(repository
        .records
        .lock()
        .expect("repository mutex poisoned")
        .contains_key(&record.id));

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, GuaranteeEventKind::Commitment);
}

#[test]
fn settlement_pays_the_shortfall_and_audits_activation() {
    let (service, _, audit) = build_service();
    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");

    let settlement = service
        .record_actual_earnings(&record.id, 80.0)
        .expect("settled");

    assert_abs_diff_eq!(settlement.outcome.topup, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(settlement.topup_paid, 10.0, epsilon = 1e-9);
    assert_eq!(settlement.record.status(), ShiftStatus::Completed);
    assert_eq!(settlement.record.actual_earnings(), Some(80.0));

    let kinds: Vec<GuaranteeEventKind> = audit.events().iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            GuaranteeEventKind::Commitment,
            GuaranteeEventKind::EarningsRecorded,
            GuaranteeEventKind::GuaranteeActivated,
        ]
    );
}

#[test]
fn earnings_above_the_minimum_need_no_topup() {
    let (service, _, audit) = build_service();
    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");

    let settlement = service
        .record_actual_earnings(&record.id, 95.0)
        .expect("settled");

    assert_eq!(settlement.topup_paid, 0.0);
    assert!(!settlement.outcome.activated());
    assert!(audit
        .events()
        .iter()
        .all(|event| event.kind != GuaranteeEventKind::GuaranteeActivated));
}

#[test]
fn second_settlement_is_rejected_and_keeps_the_first_value() {
    let (service, _, _) = build_service();
    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&record.id, 80.0)
        .expect("first settlement");

    let error = service
        .record_actual_earnings(&record.id, 150.0)
        .expect_err("second settlement rejected");
    assert!(matches!(
        error,
        GuaranteeServiceError::Repository(RepositoryError::AlreadySettled)
    ));
    assert_eq!(
        service.get(&record.id).expect("stored").actual_earnings(),
        Some(80.0)
    );
}

#[test]
fn ineligible_commitments_record_but_never_pay() {
    let (service, _, _) = build_service();
    let record = service
        .commit(commitment("w-2", 100.0), &poor_standing())
        .expect("committed");
    assert!(!record.guarantee_eligible);
    assert!(record.eligibility_reason.starts_with("failed checks"));

    let settlement = service
        .record_actual_earnings(&record.id, 80.0)
        .expect("settled");
    assert_abs_diff_eq!(settlement.outcome.topup, 10.0, epsilon = 1e-9);
    assert_eq!(settlement.topup_paid, 0.0);
}

#[test]
fn suspended_accounts_are_not_honoured() {
    let (service, _, _) = build_service();
    let mut standing = good_standing();
    standing.account = AccountStatus::Suspended;

    let record = service
        .commit(commitment("w-3", 100.0), &standing)
        .expect("committed");

    assert!(!record.guarantee_eligible);
    assert_eq!(record.eligibility_reason, "account suspended");
}

#[test]
fn commit_rejects_invalid_windows_and_amounts() {
    let (service, _, audit) = build_service();

    let mut inverted = commitment("w-1", 100.0);
    inverted.ends_at = inverted.starts_at;
    assert!(matches!(
        service.commit(inverted, &good_standing()),
        Err(GuaranteeServiceError::Engine(EngineError::InvalidInput { field: "ends_at", .. }))
    ));

    assert!(matches!(
        service.commit(commitment("w-1", -5.0), &good_standing()),
        Err(GuaranteeServiceError::Engine(EngineError::InvalidInput {
            field: "predicted_earnings",
            ..
        }))
    ));

    let mut standing = good_standing();
    standing.snapshot.acceptance_rate = 1.4;
    assert!(matches!(
        service.commit(commitment("w-1", 100.0), &standing),
        Err(GuaranteeServiceError::Engine(EngineError::InvalidInput { .. }))
    ));

    assert!(audit.events().is_empty());
}

#[test]
fn negative_actuals_leave_the_shift_committed() {
    let (service, _, _) = build_service();
    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");

    assert!(matches!(
        service.record_actual_earnings(&record.id, -1.0),
        Err(GuaranteeServiceError::Engine(EngineError::InvalidInput {
            field: "actual_earnings",
            ..
        }))
    ));
    assert_eq!(
        service.get(&record.id).expect("stored").status(),
        ShiftStatus::Committed
    );
}

#[test]
fn cancelled_shifts_cannot_be_settled_or_cancelled_again() {
    let (service, _, audit) = build_service();
    let record = service
        .commit(commitment("w-1", 100.0), &good_standing())
        .expect("committed");

    let cancelled = service.cancel(&record.id).expect("cancelled");
    assert_eq!(cancelled.status(), ShiftStatus::Cancelled);
    assert!(cancelled.cancelled_at().is_some());

    assert!(matches!(
        service.record_actual_earnings(&record.id, 50.0),
        Err(GuaranteeServiceError::Repository(RepositoryError::NotCommitted))
    ));
    assert!(matches!(
        service.cancel(&record.id),
        Err(GuaranteeServiceError::Repository(RepositoryError::NotCommitted))
    ));
    assert_eq!(
        audit.events().last().map(|event| event.kind),
        Some(GuaranteeEventKind::Cancellation)
    );
}

#[test]
fn unknown_shifts_are_not_found() {
    let (service, _, _) = build_service();
    let missing = ShiftId("shift-missing".to_string());
    assert!(matches!(
        service.get(&missing),
        Err(GuaranteeServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.record_actual_earnings(&missing, 10.0),
        Err(GuaranteeServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn repository_outages_surface_as_repository_errors() {
    let service = GuaranteeService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAudit::default()),
        GuaranteeConfig::default(),
    );
    assert!(matches!(
        service.commit(commitment("w-1", 100.0), &good_standing()),
        Err(GuaranteeServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn worker_summary_rolls_up_completed_shifts() {
    let (service, _, _) = build_service();
    let worker = WorkerId("w-sum".to_string());

    let short = service
        .commit(commitment("w-sum", 100.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&short.id, 80.0)
        .expect("settled");
    let strong = service
        .commit(commitment("w-sum", 100.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&strong.id, 120.0)
        .expect("settled");
    service
        .commit(commitment("w-sum", 100.0), &good_standing())
        .expect("committed");
    let dropped = service
        .commit(commitment("w-sum", 100.0), &good_standing())
        .expect("committed");
    service.cancel(&dropped.id).expect("cancelled");
    service
        .commit(commitment("someone-else", 100.0), &good_standing())
        .expect("committed");

    let summary = service.worker_summary(&worker).expect("summary");

    assert_eq!(summary.committed_shifts, 1);
    assert_eq!(summary.completed_shifts, 2);
    assert_eq!(summary.cancelled_shifts, 1);
    assert_eq!(summary.guarantee_activations, 1);
    assert_abs_diff_eq!(summary.total_predicted, 200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.total_actual, 200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.total_guaranteed_minimum, 180.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.total_topup, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.activation_rate_percent, 50.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.earnings_accuracy_percent, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(summary.income_improvement_percent, 5.0, epsilon = 1e-9);
}

#[test]
fn empty_summary_reports_zero_percentages() {
    let (service, _, _) = build_service();
    let summary = service
        .worker_summary(&WorkerId("nobody".to_string()))
        .expect("summary");
    assert_eq!(summary.completed_shifts, 0);
    assert_eq!(summary.activation_rate_percent, 0.0);
    assert_eq!(summary.earnings_accuracy_percent, 0.0);
    assert_eq!(summary.income_improvement_percent, 0.0);
}

#[test]
fn worker_volatility_compares_raw_and_protected_earnings() {
    let (service, _, _) = build_service();
    for actual in [40.0, 100.0, 120.0] {
        let record = service
            .commit(commitment("w-vol", 100.0), &good_standing())
            .expect("committed");
        service
            .record_actual_earnings(&record.id, actual)
            .expect("settled");
    }

    let summary = service
        .worker_volatility(&WorkerId("w-vol".to_string()))
        .expect("volatility");

    assert_eq!(summary.without_guarantee.sample_size, 3);
    assert_eq!(summary.earnings_floor_without, 40.0);
    assert_abs_diff_eq!(summary.earnings_floor_with, 90.0, epsilon = 1e-9);
    assert!(summary.volatility_reduction_percent.expect("defined") > 0.0);
}

#[test]
fn worker_volatility_needs_two_completed_shifts() {
    let (service, _, _) = build_service();
    let record = service
        .commit(commitment("w-new", 100.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&record.id, 70.0)
        .expect("settled");

    assert!(matches!(
        service.worker_volatility(&WorkerId("w-new".to_string())),
        Err(GuaranteeServiceError::Engine(EngineError::InsufficientData {
            required: 2,
            found: 1
        }))
    ));
}

#[test]
fn prediction_accuracy_scores_completed_shifts() {
    let (service, _, _) = build_service();
    for actual in [100.0, 125.0] {
        let record = service
            .commit(commitment("w-acc", 100.0), &good_standing())
            .expect("committed");
        service
            .record_actual_earnings(&record.id, actual)
            .expect("settled");
    }
    service
        .commit(commitment("w-acc", 100.0), &good_standing())
        .expect("pending shift is ignored");

    let report = service
        .prediction_accuracy(&AccuracyFilter::default())
        .expect("scored");
    assert_eq!(report.sample_size, 2);
    assert_abs_diff_eq!(report.mape.expect("defined"), 10.0, epsilon = 1e-9);

    let by_hour = service
        .prediction_accuracy(&AccuracyFilter {
            location: Some(Location::Downtown),
            hour: Some(17),
        })
        .expect("scored");
    assert_eq!(by_hour.sample_size, 2);

    assert!(matches!(
        service.prediction_accuracy(&AccuracyFilter {
            location: Some(Location::Rural),
            hour: None,
        }),
        Err(GuaranteeServiceError::Engine(EngineError::InsufficientData { .. }))
    ));

    let summary = service.accuracy_summary().expect("summary");
    assert!(summary.meets_minimum_threshold);
}

#[test]
fn audit_outage_after_settlement_keeps_the_stored_outcome() {
    let repository = Arc::new(MemoryRepository::default());
    let audit = Arc::new(FlakyAudit::accepting(1));
    let service = GuaranteeService::new(
        repository.clone(),
        audit.clone(),
        GuaranteeConfig::default(),
    );
    let record = service
        .commit(commitment("w-flaky", 100.0), &good_standing())
        .expect("committed");

    let settlement = service
        .record_actual_earnings(&record.id, 80.0)
        .expect("stored settlement is reported despite the audit outage");
    assert_abs_diff_eq!(settlement.topup_paid, 10.0, epsilon = 1e-9);
    assert_eq!(settlement.record.status(), ShiftStatus::Completed);
    assert_eq!(settlement.record.actual_earnings(), Some(80.0));

    let retry = service.record_actual_earnings(&record.id, 80.0);
    assert!(matches!(
        retry,
        Err(GuaranteeServiceError::Repository(RepositoryError::AlreadySettled))
    ));
    assert_eq!(audit.events().len(), 1);
}

#[test]
fn audit_outage_does_not_fail_commit_or_cancel() {
    let service = GuaranteeService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(FlakyAudit::accepting(0)),
        GuaranteeConfig::default(),
    );

    let record = service
        .commit(commitment("w-flaky", 100.0), &good_standing())
        .expect("committed without audit");
    let cancelled = service.cancel(&record.id).expect("cancelled without audit");
    assert_eq!(cancelled.status(), ShiftStatus::Cancelled);
}

#[test]
fn worker_shifts_list_newest_first_and_filter_by_status() {
    let (service, _, _) = build_service();
    let first = service
        .commit(commitment("w-list", 100.0), &good_standing())
        .expect("committed");
    let second = service
        .commit(commitment("w-list", 110.0), &good_standing())
        .expect("committed");
    let third = service
        .commit(commitment("w-list", 120.0), &good_standing())
        .expect("committed");
    service
        .commit(commitment("w-other", 90.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&first.id, 100.0)
        .expect("settled");

    let all: Vec<ShiftId> = service
        .worker_shifts(&WorkerId("w-list".to_string()), None)
        .expect("listed")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(all, vec![third.id.clone(), second.id.clone(), first.id.clone()]);

    let completed = service
        .worker_shifts(&WorkerId("w-list".to_string()), Some(ShiftStatus::Completed))
        .expect("listed");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first.id);

    let open = service
        .worker_shifts(&WorkerId("w-list".to_string()), Some(ShiftStatus::Committed))
        .expect("listed");
    assert_eq!(open.len(), 2);
}

#[test]
fn guarantee_history_reads_back_newest_events_first() {
    let (service, _, _) = build_service();
    let record = service
        .commit(commitment("w-hist", 100.0), &good_standing())
        .expect("committed");
    service
        .commit(commitment("w-elsewhere", 100.0), &good_standing())
        .expect("committed");
    service
        .record_actual_earnings(&record.id, 80.0)
        .expect("settled");

    let worker = WorkerId("w-hist".to_string());
    let all: Vec<GuaranteeEventKind> = service
        .guarantee_history(&worker, 50)
        .expect("history")
        .iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(
        all,
        vec![
            GuaranteeEventKind::GuaranteeActivated,
            GuaranteeEventKind::EarningsRecorded,
            GuaranteeEventKind::Commitment,
        ]
    );

    let latest = service.guarantee_history(&worker, 1).expect("history");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].kind, GuaranteeEventKind::GuaranteeActivated);
    assert_eq!(latest[0].details["topup_paid"], "10.00");
}

#[test]
fn guarantee_history_rejects_out_of_range_limits_and_surfaces_read_failures() {
    let (service, _, _) = build_service();
    let worker = WorkerId("w-hist".to_string());
    assert!(matches!(
        service.guarantee_history(&worker, 0),
        Err(GuaranteeServiceError::Engine(EngineError::InvalidInput { field: "limit", .. }))
    ));
    assert!(service.guarantee_history(&worker, 501).is_err());

    let offline = GuaranteeService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(FlakyAudit::accepting(0)),
        GuaranteeConfig::default(),
    );
    assert!(matches!(
        offline.guarantee_history(&worker, 10),
        Err(GuaranteeServiceError::Audit(_))
    ));
}

#[test]
fn performance_report_ranks_locations_and_totals_the_period() {
    let (service, _, _) = build_service();
    let settle = |shift: ShiftCommitment, actual: f64| {
        let record = service
            .commit(shift, &good_standing())
            .expect("committed");
        service
            .record_actual_earnings(&record.id, actual)
            .expect("settled");
    };
    // 54 minimum, 6 top-up
    settle(shift_at("w-perf", Location::Suburb, 1, (8, 12), 60.0), 48.0);
    settle(shift_at("w-perf", Location::Downtown, 2, (17, 21), 100.0), 120.0);
    // 45 minimum, 5 top-up
    settle(shift_at("w-perf", Location::Downtown, 3, (17, 19), 50.0), 40.0);
    service
        .commit(shift_at("w-perf", Location::Rural, 4, (9, 13), 40.0), &good_standing())
        .expect("open shift");

    let report = service
        .performance_report(&WorkerId("w-perf".to_string()))
        .expect("report");

    let period = report.period.expect("settled shifts define a period");
    assert_eq!(period.from, at(1, 0).date());
    assert_eq!(period.to, at(3, 0).date());
    assert_eq!(period.total_shifts, 3);
    assert_abs_diff_eq!(period.total_hours, 10.0, epsilon = 1e-9);

    let trend: Vec<Location> = report.earnings_trend.iter().map(|point| point.location).collect();
    assert_eq!(trend, vec![Location::Suburb, Location::Downtown, Location::Downtown]);
    assert_abs_diff_eq!(report.earnings_trend[0].topup, 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.earnings_trend[0].total_with_guarantee, 54.0, epsilon = 1e-9);
    assert_eq!(report.earnings_trend[2].hourly_rate, Some(20.0));

    assert_eq!(report.best_locations.len(), 2);
    assert_eq!(report.best_locations[0].location, Location::Downtown);
    assert_abs_diff_eq!(report.best_locations[0].avg_earnings, 80.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.best_locations[0].avg_hourly, 160.0 / 6.0, epsilon = 1e-9);
    assert_eq!(report.best_locations[1].location, Location::Suburb);
    assert_abs_diff_eq!(report.best_locations[1].avg_hourly, 12.0, epsilon = 1e-9);

    assert_abs_diff_eq!(report.earnings.total_actual, 208.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.earnings.total_topups, 11.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.earnings.total_with_guarantee, 219.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.earnings.avg_hourly, 20.8, epsilon = 1e-9);
    assert_abs_diff_eq!(
        report.earnings.income_boost_percent,
        11.0 / 208.0 * 100.0,
        epsilon = 1e-9
    );
}

#[test]
fn performance_report_without_settled_shifts_is_empty() {
    let (service, _, _) = build_service();
    service
        .commit(commitment("w-new", 100.0), &good_standing())
        .expect("committed");

    let report = service
        .performance_report(&WorkerId("w-new".to_string()))
        .expect("report");
    assert!(report.period.is_none());
    assert!(report.earnings_trend.is_empty());
    assert!(report.best_locations.is_empty());
    assert_eq!(report.earnings.total_actual, 0.0);
    assert_eq!(report.earnings.income_boost_percent, 0.0);
}
