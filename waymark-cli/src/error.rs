//! Error types emitted by the Waymark CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use waymark_core::{CalculationError, LaunchError, SessionError, TravelMode};
use waymark_sim::SimulationError;

/// Errors emitted by the Waymark CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The log subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(Box<dyn std::error::Error + Send + Sync>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A coordinate option was not a `lat,lon` pair.
    #[error("--{field} expects lat,lon but got '{value}'")]
    InvalidCoordinate {
        /// Flag name.
        field: &'static str,
        /// Value as given.
        value: String,
    },
    /// An option value could not be interpreted.
    #[error("invalid --{field}: {reason}")]
    InvalidOption {
        /// Flag name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The simulated routing engine could not start.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    /// The calculation was refused or failed.
    #[error("route calculation failed: {0}")]
    Calculation(#[from] CalculationError),
    /// No result arrived in time; the pending calculation was cancelled.
    #[error("{mode} calculation did not finish within {timeout:?}")]
    Timeout {
        /// Mode that was calculating.
        mode: TravelMode,
        /// Limit that elapsed.
        timeout: Duration,
    },
    /// Selecting the main route failed.
    #[error("route selection failed: {0}")]
    Selection(#[from] SessionError),
    /// Navigation could not be started.
    #[error("navigation failed: {0}")]
    Launch(#[from] LaunchError),
    /// Building the async runtime used to wait for results failed.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Serialising the plan report failed.
    #[error("failed to serialise plan report: {0}")]
    SerialisePlanReport(#[source] serde_json::Error),
    /// Writing the plan report failed.
    #[error("failed to write plan output: {0}")]
    WritePlanOutput(#[source] std::io::Error),
}
