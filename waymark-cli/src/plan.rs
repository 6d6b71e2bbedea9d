//! Plan command implementation for the Waymark CLI.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use geo::Coord;
use log::{debug, info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use waymark_core::{
    CalculateRoute, LaunchMode, RoutePlanner, RouteStrategy, RouteSummary, RouteTicket,
    Selection, TravelMode, TravelPolicy,
};
use waymark_sim::{
    ActiveGuidance, SimulatedNavigationEngine, SimulatedRoutingConfig, SimulatedRoutingEngine,
};

use crate::{
    ARG_ALTERNATIVES, ARG_FAIL_CODE, ARG_FROM, ARG_LATENCY_MS, ARG_MODE, ARG_NAVIGATE,
    ARG_ROUTE_ID, ARG_ROUTE_INDEX, ARG_STRATEGY, ARG_TIMEOUT_MS, ARG_TO, ARG_TRAVEL, ARG_VIA,
    CliError, ENV_TO,
};

/// How long to wait for the engine when `--timeout-ms` is not given.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Calculate a route with the simulated routing engine, \
                 optionally choose the main alternative and start \
                 navigation on it, then print the session as JSON. \
                 Options can come from CLI flags, configuration files, \
                 or environment variables.",
    about = "Calculate, select and launch a route"
)]
#[ortho_config(prefix = "WAYMARK")]
pub(crate) struct PlanArgs {
    /// Start point as `lat,lon`; the engine's current position when omitted.
    #[arg(long = ARG_FROM, value_name = "lat,lon")]
    #[serde(default)]
    pub(crate) from: Option<String>,
    /// Destination as `lat,lon`.
    #[arg(long = ARG_TO, value_name = "lat,lon")]
    #[serde(default)]
    pub(crate) to: Option<String>,
    /// Intermediate stop as `lat,lon`; repeat for several.
    #[arg(long = ARG_VIA, value_name = "lat,lon")]
    #[serde(default)]
    pub(crate) via: Vec<String>,
    /// Travel mode (drive, truck, walk, ride, e-bike, motorcycle).
    #[arg(long = ARG_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<String>,
    /// Explicit engine strategy code for motorised modes.
    #[arg(long = ARG_STRATEGY, value_name = "code", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) strategy: Option<i32>,
    /// Travel policy for walk, ride and e-bike (single or multiple).
    #[arg(long = ARG_TRAVEL, value_name = "policy")]
    #[serde(default)]
    pub(crate) travel: Option<String>,
    /// Make the alternative with this engine id the main route.
    #[arg(long = ARG_ROUTE_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) route_id: Option<i64>,
    /// Make the alternative at this position the main route.
    #[arg(long = ARG_ROUTE_INDEX, value_name = "index")]
    #[serde(default)]
    pub(crate) route_index: Option<usize>,
    /// Start navigation on the main route with this feed (gps or simulated).
    #[arg(long = ARG_NAVIGATE, value_name = "launch-mode")]
    #[serde(default)]
    pub(crate) navigate: Option<String>,
    /// Simulated engine latency in milliseconds.
    #[arg(long = ARG_LATENCY_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) latency_ms: Option<u64>,
    /// Alternatives produced for multi-route requests (1 to 3).
    #[arg(long = ARG_ALTERNATIVES, value_name = "count")]
    #[serde(default)]
    pub(crate) alternatives: Option<u8>,
    /// Make the simulated engine fail with this code.
    #[arg(long = ARG_FAIL_CODE, value_name = "code", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) fail_code: Option<i32>,
    /// Give up waiting for a result after this many milliseconds.
    #[arg(long = ARG_TIMEOUT_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) timeout_ms: Option<u64>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanConfig {
    /// Calculation to submit.
    pub(crate) request: CalculateRoute,
    /// Main-route choice applied after the calculation.
    pub(crate) selection: Selection,
    /// Launch navigation with this feed when set.
    pub(crate) navigate: Option<LaunchMode>,
    /// Behaviour of the simulated routing engine.
    pub(crate) simulation: SimulatedRoutingConfig,
    /// Longest wait for a result.
    pub(crate) timeout: Duration,
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let to = args.to.as_deref().ok_or(CliError::MissingArgument {
            field: ARG_TO,
            env: ENV_TO,
        })?;
        let mode = args
            .mode
            .as_deref()
            .map_or(Ok(TravelMode::Drive), str::parse::<TravelMode>)
            .map_err(|reason| CliError::InvalidOption {
                field: ARG_MODE,
                reason,
            })?;

        let mut request =
            CalculateRoute::new(mode).with_destination(parse_coordinate(ARG_TO, to)?);
        if let Some(strategy) = resolve_strategy(args.strategy, args.travel.as_deref())? {
            request = request.with_strategy(strategy);
        }
        if let Some(from) = args.from.as_deref() {
            request = request.with_origin(parse_coordinate(ARG_FROM, from)?);
        }
        for via in &args.via {
            request = request.with_waypoint(parse_coordinate(ARG_VIA, via)?);
        }

        let navigate = args
            .navigate
            .as_deref()
            .map(str::parse::<LaunchMode>)
            .transpose()
            .map_err(|reason| CliError::InvalidOption {
                field: ARG_NAVIGATE,
                reason,
            })?;

        let mut simulation = SimulatedRoutingConfig::default();
        if let Some(latency_ms) = args.latency_ms {
            simulation = simulation.with_latency(Duration::from_millis(latency_ms));
        }
        if let Some(alternatives) = args.alternatives {
            simulation = simulation.with_alternatives(alternatives);
        }
        if let Some(code) = args.fail_code {
            simulation = simulation.with_failure_code(code);
        }
        simulation.validate()?;

        Ok(Self {
            request,
            selection: Selection::from_options(args.route_id, args.route_index),
            navigate,
            simulation,
            timeout: args.timeout_ms.map_or(DEFAULT_TIMEOUT, Duration::from_millis),
        })
    }
}

/// Parse a `lat,lon` pair into a coordinate with longitude on `x`.
pub(crate) fn parse_coordinate(field: &'static str, value: &str) -> Result<Coord<f64>, CliError> {
    let invalid = || CliError::InvalidCoordinate {
        field,
        value: value.to_owned(),
    };
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
    Ok(Coord {
        x: longitude,
        y: latitude,
    })
}

/// `None` leaves the mode's default strategy in place.
fn resolve_strategy(
    strategy_code: Option<i32>,
    travel_policy: Option<&str>,
) -> Result<Option<RouteStrategy>, CliError> {
    match (strategy_code, travel_policy) {
        (Some(_), Some(_)) => Err(CliError::InvalidOption {
            field: ARG_TRAVEL,
            reason: format!("cannot be combined with --{ARG_STRATEGY}"),
        }),
        (Some(code), None) => Ok(Some(RouteStrategy::Code(code))),
        (None, Some(policy)) => parse_travel_policy(policy).map(|p| Some(RouteStrategy::Travel(p))),
        (None, None) => Ok(None),
    }
}

fn parse_travel_policy(policy: &str) -> Result<TravelPolicy, CliError> {
    match policy.to_lowercase().as_str() {
        "single" => Ok(TravelPolicy::Single),
        "multiple" => Ok(TravelPolicy::Multiple),
        other => Err(CliError::InvalidOption {
            field: ARG_TRAVEL,
            reason: format!("unknown travel policy '{other}'"),
        }),
    }
}

/// Guidance started by the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NavigationReport {
    /// Engine id of the route being followed.
    pub(crate) route_id: i64,
    /// Position feed in use.
    pub(crate) launch_mode: LaunchMode,
}

impl From<ActiveGuidance> for NavigationReport {
    fn from(guidance: ActiveGuidance) -> Self {
        Self {
            route_id: guidance.route_id,
            launch_mode: guidance.mode,
        }
    }
}

/// JSON document printed by `waymark plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlanReport {
    /// Session after any selection was applied.
    pub(crate) summary: RouteSummary,
    /// Guidance started on the main route, if requested.
    pub(crate) navigation: Option<NavigationReport>,
}

/// Execute the `plan` command using arguments merged from every layer.
pub(crate) fn run_plan_with(args: PlanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_plan(&config, writer)
}

/// Calculate, select and optionally launch, then write the report.
pub(crate) fn execute_plan(config: &PlanConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let navigation = Arc::new(SimulatedNavigationEngine::new());
    let routing = SimulatedRoutingEngine::new(config.simulation.clone())?;
    let planner = RoutePlanner::new(Arc::new(routing), navigation.clone());

    let ticket = planner.calculate(&config.request)?;
    let calculated = wait_for(&planner, ticket, config.timeout)?;
    let token = calculated.token;
    info!(
        "calculated {} {} alternatives in session {token}",
        calculated.count(),
        calculated.mode
    );

    if let Some(launch_mode) = config.navigate {
        planner.start_navigation(token, launch_mode, config.selection)?;
    } else if !config.selection.is_keep() {
        planner.select(token, config.selection)?;
    }

    let report = PlanReport {
        summary: planner.store().get(token)?.summary(),
        navigation: navigation.active().map(NavigationReport::from),
    };
    if planner.release(token) {
        debug!("released session {token}");
    }
    write_plan_report(writer, &report)
}

fn wait_for(
    planner: &RoutePlanner,
    ticket: RouteTicket,
    timeout: Duration,
) -> Result<RouteSummary, CliError> {
    let mode = ticket.mode();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(CliError::Runtime)?;
    runtime
        .block_on(async move { tokio::time::timeout(timeout, ticket).await })
        .map_err(|_elapsed| {
            if planner.coordinator().cancel_pending(mode) {
                warn!("cancelled {mode} calculation after {timeout:?}");
            }
            CliError::Timeout { mode, timeout }
        })?
        .map_err(CliError::from)
}

fn write_plan_report(writer: &mut dyn Write, report: &PlanReport) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialisePlanReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WritePlanOutput)?;
    writer.write_all(b"\n").map_err(CliError::WritePlanOutput)?;
    Ok(())
}
