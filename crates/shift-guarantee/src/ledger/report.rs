use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use super::domain::{ShiftEarningsRecord, ShiftId, ShiftStatus, WorkerId};
use crate::engine::Location;

/// One completed shift in a worker's earnings trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsTrendPoint {
    pub shift_id: ShiftId,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub location: Location,
    pub start_hour: u8,
    pub predicted: f64,
    pub actual: f64,
    pub topup: f64,
    pub total_with_guarantee: f64,
    pub hours: f64,
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationPerformance {
    pub location: Location,
    pub shifts_worked: usize,
    pub total_earnings: f64,
    pub avg_earnings: f64,
    pub total_hours: f64,
    pub avg_hourly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_shifts: usize,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EarningsBreakdown {
    pub total_actual: f64,
    pub total_topups: f64,
    pub total_with_guarantee: f64,
    pub avg_per_shift: f64,
    pub avg_hourly: f64,
    pub income_boost_percent: f64,
}

/// Completed-shift performance for one worker. `period` is `None` until a shift is
/// settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub worker_id: WorkerId,
    pub period: Option<ReportPeriod>,
    pub earnings: EarningsBreakdown,
    pub earnings_trend: Vec<EarningsTrendPoint>,
    pub best_locations: Vec<LocationPerformance>,
}

#[derive(Default)]
struct LocationTally {
    total: f64,
    count: usize,
    hours: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub(crate) fn build_performance_report(
    worker_id: &WorkerId,
    records: &[ShiftEarningsRecord],
) -> PerformanceReport {
    let mut completed: Vec<&ShiftEarningsRecord> = records
        .iter()
        .filter(|record| record.status() == ShiftStatus::Completed)
        .collect();
    completed.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));

    let earnings_trend: Vec<EarningsTrendPoint> = completed
        .iter()
        .map(|record| {
            let actual = record.actual_earnings().unwrap_or_default();
            let topup = record.topup_paid();
            let date = record.starts_at.date();
            EarningsTrendPoint {
                shift_id: record.id.clone(),
                date,
                weekday: date.weekday(),
                location: record.location,
                start_hour: record.start_hour(),
                predicted: record.predicted_earnings,
                actual,
                topup,
                total_with_guarantee: actual + topup,
                hours: record.duration_hours(),
                hourly_rate: record.actual_hourly_rate(),
            }
        })
        .collect();

    let mut tallies: BTreeMap<Location, LocationTally> = BTreeMap::new();
    for point in &earnings_trend {
        let tally = tallies.entry(point.location).or_default();
        tally.total += point.actual;
        tally.count += 1;
        tally.hours += point.hours;
    }
    let mut best_locations: Vec<LocationPerformance> = tallies
        .into_iter()
        .map(|(location, tally)| LocationPerformance {
            location,
            shifts_worked: tally.count,
            total_earnings: tally.total,
            avg_earnings: ratio(tally.total, tally.count as f64),
            total_hours: tally.hours,
            avg_hourly: ratio(tally.total, tally.hours),
        })
        .collect();
    best_locations.sort_by(|a, b| {
        b.avg_earnings
            .total_cmp(&a.avg_earnings)
            .then_with(|| a.location.cmp(&b.location))
    });

    let total_actual: f64 = earnings_trend.iter().map(|point| point.actual).sum();
    let total_topups: f64 = earnings_trend.iter().map(|point| point.topup).sum();
    let total_hours: f64 = earnings_trend.iter().map(|point| point.hours).sum();

    let period = match (earnings_trend.first(), earnings_trend.last()) {
        (Some(first), Some(last)) => Some(ReportPeriod {
            from: first.date,
            to: last.date,
            total_shifts: earnings_trend.len(),
            total_hours,
        }),
        _ => None,
    };

    PerformanceReport {
        worker_id: worker_id.clone(),
        period,
        earnings: EarningsBreakdown {
            total_actual,
            total_topups,
            total_with_guarantee: total_actual + total_topups,
            avg_per_shift: ratio(total_actual, earnings_trend.len() as f64),
            avg_hourly: ratio(total_actual, total_hours),
            income_boost_percent: ratio(total_topups, total_actual) * 100.0,
        },
        earnings_trend,
        best_locations,
    }
}
