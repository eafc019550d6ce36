pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rately_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "rately",
    about = "Rately operator CLI",
    long_about = "Operate the Rately ticket cost-estimation service: migrations, seed \
                  fixtures, readiness checks, and the quote lifecycle.",
    after_help = "Examples:\n  rately migrate\n  rately seed\n  rately estimate --ticket-id t-1 \
                  --ticket-type support --severity low --impact critical --users-impacted 40 \
                  --effort-level low --hours-min 4 --hours-max 8"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the baseline pricing catalog, effort bands, and SLA fixtures")]
    Seed,
    #[command(about = "Validate config and database connectivity readiness checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Estimate a ticket and open a pending approval for the draft quote")]
    Estimate(commands::estimate::EstimateArgs),
    #[command(about = "Produce the next quote version for a ticket with field adjustments")]
    Revise(commands::revise::ReviseArgs),
    #[command(about = "Approve or reject a pending quote approval")]
    Decide(commands::decide::DecideArgs),
}

pub fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Estimate(args) => commands::estimate::run(args),
        Command::Revise(args) => commands::revise::run(args),
        Command::Decide(args) => commands::decide::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

// Logs go to stderr so stdout stays machine-readable. Config problems are
// reported by the command itself, so a failed load falls back to defaults.
fn init_tracing() {
    let logging = AppConfig::load(LoadOptions::default()).unwrap_or_default().logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
