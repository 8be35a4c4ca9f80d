use crate::infra::{parse_date_type, parse_location};
use clap::Args;
use shift_guarantee::config::AppConfig;
use shift_guarantee::engine::estimator::validate_prediction_input;
use shift_guarantee::engine::{
    analyze_volatility, summarize_accuracy, AccuracyFilter, AccuracyReport, DateType,
    DemandForecaster, EarningsEstimator, EligibilityEvaluator, EligibilitySnapshot,
    GuaranteeOutcome, GuaranteeThreshold, Location, SeriesStatistics, ShiftOptimizer,
    VolatilitySummary,
};
use shift_guarantee::error::AppError;
use shift_guarantee::import::{accuracy_samples, volatility_series, ShiftCsvImporter};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Hour of day, 0-23
    #[arg(long)]
    pub(crate) hour: u8,
    /// Day of week, 0 = Monday
    #[arg(long)]
    pub(crate) day: u8,
    /// downtown, suburb, or rural
    #[arg(long, value_parser = parse_location)]
    pub(crate) location: Location,
    /// Demand level in [0, 1]; defaults to the hourly forecast
    #[arg(long)]
    pub(crate) demand: Option<f64>,
    /// Sum predictions over a multi-hour window starting at `hour`
    #[arg(long)]
    pub(crate) duration: Option<u8>,
}

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    #[arg(long, value_parser = parse_location)]
    pub(crate) location: Location,
    /// weekday, friday, or weekend
    #[arg(long, value_parser = parse_date_type, default_value = "weekday")]
    pub(crate) date_type: DateType,
    #[arg(long, default_value_t = 4)]
    pub(crate) duration: u8,
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
}

#[derive(Args, Debug)]
pub(crate) struct TopupArgs {
    #[arg(long)]
    pub(crate) predicted: f64,
    #[arg(long)]
    pub(crate) actual: f64,
    /// Override GUARANTEE_THRESHOLD for this calculation
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    #[arg(long)]
    pub(crate) active_hours: f64,
    #[arg(long)]
    pub(crate) acceptance_rate: f64,
    #[arg(long)]
    pub(crate) cancellation_rate: f64,
    #[arg(long)]
    pub(crate) rating: f64,
}

#[derive(Args, Debug)]
pub(crate) struct VolatilityArgs {
    /// Shift history export (worker_id, location, start_time, end_time, predicted_earnings, actual_earnings)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct AccuracyArgs {
    #[arg(long)]
    pub(crate) csv: PathBuf,
    #[arg(long, value_parser = parse_location)]
    pub(crate) location: Option<Location>,
    #[arg(long)]
    pub(crate) hour: Option<u8>,
}

fn resolve_threshold(
    config: &AppConfig,
    ratio: Option<f64>,
) -> Result<GuaranteeThreshold, AppError> {
    match ratio {
        Some(ratio) => Ok(GuaranteeThreshold::new(ratio)?),
        None => Ok(config.guarantee.threshold),
    }
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let demand = args
        .demand
        .unwrap_or_else(|| DemandForecaster::new().forecast(args.location, args.hour));
    validate_prediction_input(args.hour, args.day, demand)?;

    let estimator = EarningsEstimator::standard();
    let hourly = estimator.predict(args.hour, args.day, args.location, demand);
    println!(
        "{} at {:02}:00 (day {}, demand {:.2}): ${:.2}/h",
        args.location.label(),
        args.hour,
        args.day,
        demand,
        hourly
    );
    if let Some(duration) = args.duration {
        let total = estimator.predict_shift(args.hour, args.day, duration, args.location, demand);
        println!("  {duration}h window: ${total:.2}");
    }
    Ok(())
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let optimizer = ShiftOptimizer::new(EarningsEstimator::standard(), DemandForecaster::new());
    let picks = optimizer.recommend(args.location, args.date_type, args.duration, args.top)?;

    println!(
        "Best {}h shifts in {} ({:?})",
        args.duration,
        args.location.label(),
        args.date_type
    );
    for (rank, pick) in picks.iter().enumerate() {
        println!(
            "  {}. {:02}:00 start  ${:.2}  (demand {:.2})",
            rank + 1,
            pick.start_hour,
            pick.predicted_earnings,
            pick.demand_level
        );
    }
    Ok(())
}

pub(crate) fn run_topup(args: TopupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let threshold = resolve_threshold(&config, args.threshold)?;
    let outcome = GuaranteeOutcome::evaluate(args.predicted, args.actual, threshold)?;

    println!(
        "Guaranteed minimum ${:.2} ({:.0}% of ${:.2})",
        outcome.guaranteed_minimum,
        threshold.ratio() * 100.0,
        outcome.predicted_earnings
    );
    if outcome.activated() {
        println!(
            "  Top-up ${:.2}; worker receives ${:.2}",
            outcome.topup,
            outcome.protected_earnings()
        );
    } else {
        println!("  No top-up: actual ${:.2} meets the minimum", outcome.actual_earnings);
    }
    Ok(())
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let snapshot = EligibilitySnapshot::new(
        args.active_hours,
        args.acceptance_rate,
        args.cancellation_rate,
        args.rating,
    )?;
    let result = EligibilityEvaluator::new(config.guarantee.eligibility).evaluate(&snapshot);

    println!(
        "Eligible: {}",
        if result.is_eligible { "yes" } else { "no" }
    );
    for (criterion, outcome) in &result.criteria {
        println!(
            "  [{}] {:<22} {:>8.2} (required {:.2})",
            if outcome.pass { "pass" } else { "FAIL" },
            criterion.label(),
            outcome.value,
            outcome.required
        );
    }
    Ok(())
}

pub(crate) fn run_volatility(args: VolatilityArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let threshold = resolve_threshold(&config, args.threshold)?;
    let shifts = ShiftCsvImporter::from_path(&args.csv)?;
    let (without, with) = volatility_series(&shifts, threshold)?;
    let summary = analyze_volatility(&without, &with)?;

    render_volatility(&summary);
    Ok(())
}

pub(crate) fn run_accuracy(args: AccuracyArgs) -> Result<(), AppError> {
    let shifts = ShiftCsvImporter::from_path(&args.csv)?;
    let samples = accuracy_samples(&shifts);
    let filter = AccuracyFilter {
        location: args.location,
        hour: args.hour,
    };

    if filter == AccuracyFilter::default() {
        let summary = summarize_accuracy(&samples)?;
        render_accuracy("overall", &summary.overall);
        for (location, report) in &summary.by_location {
            render_accuracy(location.label(), report);
        }
        println!(
            "Meets minimum threshold (MAPE <= 20%): {}",
            if summary.meets_minimum_threshold { "yes" } else { "no" }
        );
    } else {
        let report = filter.score(&samples)?;
        render_accuracy(&filter.describe(), &report);
    }
    Ok(())
}

fn render_series(label: &str, stats: &SeriesStatistics) {
    println!(
        "  {:<18} mean ${:>8.2}  std ${:>7.2}  cv {}  floor ${:.2}  iqr ${:.2}",
        label,
        stats.mean,
        stats.std_dev,
        format_optional_percent(stats.cv),
        stats.min,
        stats.iqr
    );
}

pub(crate) fn render_volatility(summary: &VolatilitySummary) {
    println!(
        "Earnings volatility over {} shifts",
        summary.without_guarantee.sample_size
    );
    render_series("without guarantee", &summary.without_guarantee);
    render_series("with guarantee", &summary.with_guarantee);
    println!(
        "  CV reduction {}  std reduction {}",
        format_optional_percent(summary.volatility_reduction_percent),
        format_optional_percent(summary.std_dev_reduction_percent)
    );
    println!("  {}", summary.interpretation());
}

pub(crate) fn render_accuracy(label: &str, report: &AccuracyReport) {
    println!(
        "  {:<24} n={:<4} MAPE {}  MAE ${:.2}  RMSE ${:.2}  R² {}  level {}",
        label,
        report.sample_size,
        format_optional_percent(report.mape),
        report.mae,
        report.rmse,
        report
            .r2
            .map_or_else(|| "n/a".to_string(), |r2| format!("{r2:.3}")),
        report
            .accuracy_level
            .map_or("n/a", |level| level.label())
    );
}

fn format_optional_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.1}%"))
}
