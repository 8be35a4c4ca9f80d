use crate::commands::{
    run_accuracy, run_eligibility, run_predict, run_recommend, run_topup, run_volatility,
    AccuracyArgs, EligibilityArgs, PredictArgs, RecommendArgs, TopupArgs, VolatilityArgs,
};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use shift_guarantee::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Shift Guarantee",
    about = "Estimate shift earnings, settle income guarantees, and report on their impact",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Predict hourly (or windowed) earnings for a location and time
    Predict(PredictArgs),
    /// Rank the best shift start hours for a location
    Recommend(RecommendArgs),
    /// Compute the guarantee top-up for a settled shift
    Topup(TopupArgs),
    /// Check a worker activity snapshot against the eligibility rules
    Eligibility(EligibilityArgs),
    /// Compare earnings volatility with and without the guarantee from a CSV export
    Volatility(VolatilityArgs),
    /// Score prediction accuracy from a CSV export
    Accuracy(AccuracyArgs),
    /// Replay a shift history through the guarantee ledger and print the roll-ups
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Predict(args) => run_predict(args),
        Command::Recommend(args) => run_recommend(args),
        Command::Topup(args) => run_topup(args),
        Command::Eligibility(args) => run_eligibility(args),
        Command::Volatility(args) => run_volatility(args),
        Command::Accuracy(args) => run_accuracy(args),
        Command::Demo(args) => run_demo(args),
    }
}
