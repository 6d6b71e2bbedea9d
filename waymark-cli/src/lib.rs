//! Command-line interface for planning routes against the simulated engines.
#![forbid(unsafe_code)]

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

mod error;
mod plan;

pub use error::CliError;

use plan::{PlanArgs, run_plan_with};

const ARG_FROM: &str = "from";
const ARG_TO: &str = "to";
const ARG_VIA: &str = "via";
const ARG_MODE: &str = "mode";
const ARG_STRATEGY: &str = "strategy";
const ARG_TRAVEL: &str = "travel";
const ARG_ROUTE_ID: &str = "route-id";
const ARG_ROUTE_INDEX: &str = "route-index";
const ARG_NAVIGATE: &str = "navigate";
const ARG_LATENCY_MS: &str = "latency-ms";
const ARG_ALTERNATIVES: &str = "alternatives";
const ARG_FAIL_CODE: &str = "fail-code";
const ARG_TIMEOUT_MS: &str = "timeout-ms";
const ENV_TO: &str = "WAYMARK_CMDS_PLAN_TO";

/// Run the Waymark CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when parsing, configuration or planning fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    install_logging(cli.verbose)?;
    match cli.command {
        Command::Plan(args) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            run_plan_with(args, &mut handle)?;
        }
    }
    Ok(())
}

fn install_logging(verbosity: u8) -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(CliError::Logging)
}

const fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "waymark",
    about = "Plan and launch routes against the simulated Waymark engines",
    version
)]
struct Cli {
    /// Increase log output (repeat for debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate a route, optionally select a main route and navigate it.
    Plan(PlanArgs),
}

#[cfg(test)]
mod tests;
