pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::predict::PredictArgs;

#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    about = "Sentinel price-audit operator CLI",
    long_about = "Inspect configuration, prepare the market-data store, and run one-off price assessments.",
    after_help = "Examples:\n  sentinel doctor --json\n  sentinel seed\n  sentinel predict --item \"ayam bersih\" --region Selangor --date 2025-07-01 --price 9.80"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, model artifacts and policy tables")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo market data and verify coverage")]
    Seed,
    #[command(about = "Assess one commodity price and print the prediction report")]
    Predict(PredictArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Predict(args) => commands::predict::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
