use crate::commands::{run_predict, run_profile, run_train, PredictArgs, ProfileArgs, TrainArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use credit_risk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Credit Risk Scoring",
    about = "Train, inspect, and serve the credit default risk model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP scoring service (default command)
    Serve(ServeArgs),
    /// Fit the encoder and classifiers on a labelled CSV and persist the artifacts
    Train(TrainArgs),
    /// Score a single applicant with the persisted artifacts
    Predict(PredictArgs),
    /// Print default rates and column statistics for a labelled CSV
    Profile(ProfileArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory holding encoder.json and model.json
    #[arg(long)]
    pub(crate) artifact_dir: Option<PathBuf>,
    /// Exit instead of serving degraded when the artifacts fail to load
    #[arg(long)]
    pub(crate) fail_fast: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Train(args) => run_train(args),
        Command::Predict(args) => run_predict(args),
        Command::Profile(args) => run_profile(args),
    }
}
