use crate::commands::{render_accuracy, render_volatility};
use crate::infra::{InMemoryAuditLog, InMemoryShiftRepository};
use clap::Args;
use shift_guarantee::config::AppConfig;
use shift_guarantee::engine::{
    DateType, DemandForecaster, EarningsEstimator, EligibilitySnapshot, Location, ShiftOptimizer,
};
use shift_guarantee::error::AppError;
use shift_guarantee::import::{ImportedShift, ShiftCsvImporter};
use shift_guarantee::ledger::{
    AccountStatus, GuaranteeEventKind, GuaranteeService, GuaranteeSummary, WorkerId,
    WorkerStanding,
};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_HISTORY: &str = "\
worker_id,location,start_time,end_time,predicted_earnings,actual_earnings
w-101,downtown,2025-09-29 17:00:00,2025-09-29 21:00:00,148.0,121.0
w-101,downtown,2025-09-30 17:00:00,2025-09-30 21:00:00,148.0,155.0
w-101,downtown,2025-10-03 17:00:00,2025-10-03 21:00:00,161.0,118.0
w-101,suburb,2025-10-04 09:00:00,2025-10-04 13:00:00,72.0,74.5
w-101,downtown,2025-10-05 18:00:00,2025-10-05 22:00:00,168.0,
w-202,suburb,2025-09-29 08:00:00,2025-09-29 12:00:00,62.0,58.0
w-202,suburb,2025-10-01 12:00:00,2025-10-01 16:00:00,68.0,49.0
w-202,rural,2025-10-02 10:00:00,2025-10-02 14:00:00,46.0,47.5
w-202,rural,2025-10-04 10:00:00,2025-10-04 14:00:00,52.0,39.0
w-303,rural,2025-09-30 06:00:00,2025-09-30 10:00:00,40.0,31.0
w-303,rural,2025-10-01 06:00:00,2025-10-01 10:00:00,40.0,44.0
";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Shift history export to replay instead of the built-in sample.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Treat every worker as falling short of the eligibility bar.
    #[arg(long)]
    pub(crate) ineligible: bool,
    /// Skip the shift recommendation portion of the demo.
    #[arg(long)]
    pub(crate) skip_recommendations: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        csv,
        ineligible,
        skip_recommendations,
    } = args;

    let config = AppConfig::load()?;
    let (shifts, source) = match csv {
        Some(path) => {
            let label = path.display().to_string();
            (ShiftCsvImporter::from_path(&path)?, label)
        }
        None => (
            ShiftCsvImporter::from_reader(Cursor::new(SAMPLE_HISTORY))?,
            "built-in sample".to_string(),
        ),
    };

    println!("Earnings guarantee demo");
    println!(
        "Replaying {} shifts from {} at a {:.0}% guarantee",
        shifts.len(),
        source,
        config.guarantee.threshold.ratio() * 100.0
    );

    if !skip_recommendations {
        render_recommendations()?;
    }

    let audit = Arc::new(InMemoryAuditLog::default());
    let service = GuaranteeService::new(
        Arc::new(InMemoryShiftRepository::default()),
        audit.clone(),
        config.guarantee.clone(),
    );
    let standing = demo_standing(ineligible);
    replay(&service, &shifts, &standing)?;

    let workers: BTreeSet<WorkerId> = shifts.iter().map(|shift| shift.worker_id.clone()).collect();
    for worker in &workers {
        let summary = service.worker_summary(worker)?;
        render_summary(&summary);
        let report = service.performance_report(worker)?;
        if let Some(best) = report.best_locations.first() {
            println!(
                "  Best location {} (${:.2} per shift, ${:.2}/h)",
                best.location.label(),
                best.avg_earnings,
                best.avg_hourly
            );
        }
        match service.worker_volatility(worker) {
            Ok(volatility) => render_volatility(&volatility),
            Err(err) => println!("  Volatility unavailable: {err}"),
        }
    }

    println!("\nPrediction accuracy");
    match service.accuracy_summary() {
        Ok(summary) => {
            render_accuracy("overall", &summary.overall);
            for (location, report) in &summary.by_location {
                render_accuracy(location.label(), report);
            }
            println!(
                "  Meets minimum threshold (MAPE <= 20%): {}",
                if summary.meets_minimum_threshold { "yes" } else { "no" }
            );
        }
        Err(err) => println!("  Accuracy unavailable: {err}"),
    }

    let events = audit.events();
    println!("\nAudit trail: {} events", events.len());
    for event in events
        .iter()
        .filter(|event| event.kind == GuaranteeEventKind::GuaranteeActivated)
    {
        let topup = event.details.get("topup_paid").map_or("?", String::as_str);
        println!(
            "  {} {} {} top-up ${}",
            event.kind.label(),
            event.shift_id.0,
            event.worker_id.0,
            topup
        );
    }

    Ok(())
}

fn replay(
    service: &GuaranteeService<InMemoryShiftRepository, InMemoryAuditLog>,
    shifts: &[ImportedShift],
    standing: &WorkerStanding,
) -> Result<(), AppError> {
    for shift in shifts {
        let record = service.commit(shift.commitment(), standing)?;
        if let Some(actual) = shift.actual_earnings {
            service.record_actual_earnings(&record.id, actual)?;
        }
    }
    Ok(())
}

fn demo_standing(ineligible: bool) -> WorkerStanding {
    let snapshot = if ineligible {
        EligibilitySnapshot {
            active_hours_week: 12.0,
            acceptance_rate: 0.88,
            cancellation_rate: 0.09,
            avg_rating: 4.1,
        }
    } else {
        EligibilitySnapshot {
            active_hours_week: 28.0,
            acceptance_rate: 0.97,
            cancellation_rate: 0.02,
            avg_rating: 4.7,
        }
    };
    WorkerStanding {
        snapshot,
        account: AccountStatus::Active,
    }
}

fn render_recommendations() -> Result<(), AppError> {
    let optimizer = ShiftOptimizer::new(EarningsEstimator::standard(), DemandForecaster::new());
    println!("\nTop 4h shifts by location (Friday)");
    for location in Location::ordered() {
        let picks = optimizer.recommend(location, DateType::Friday, 4, 3)?;
        let rendered: Vec<String> = picks
            .iter()
            .map(|pick| format!("{:02}:00 ${:.2}", pick.start_hour, pick.predicted_earnings))
            .collect();
        println!("  {:<9} {}", location.label(), rendered.join("  "));
    }
    Ok(())
}

fn render_summary(summary: &GuaranteeSummary) {
    println!("\nWorker {}", summary.worker_id.0);
    println!(
        "  Shifts: {} completed, {} open, {} cancelled",
        summary.completed_shifts, summary.committed_shifts, summary.cancelled_shifts
    );
    println!(
        "  Predicted ${:.2}  actual ${:.2}  guaranteed ${:.2}",
        summary.total_predicted, summary.total_actual, summary.total_guaranteed_minimum
    );
    println!(
        "  Guarantee activated on {} shift(s) ({:.1}%), top-ups ${:.2} (+{:.1}% income)",
        summary.guarantee_activations,
        summary.activation_rate_percent,
        summary.total_topup,
        summary.income_improvement_percent
    );
    println!(
        "  Earnings accuracy {:.1}% of prediction",
        summary.earnings_accuracy_percent
    );
}
