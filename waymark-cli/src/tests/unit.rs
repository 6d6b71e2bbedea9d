//! Focused unit tests covering plan configuration and execution.

use super::*;
use crate::plan::{DEFAULT_TIMEOUT, PlanArgs, PlanConfig, execute_plan, parse_coordinate};
use geo::Coord;
use rstest::rstest;
use std::time::Duration;
use waymark_core::{
    CalculationError, RouteStrategy, Selection, SessionError, TravelMode, TravelPolicy,
};
use waymark_sim::SimulationError;

fn args_to(destination: &str) -> PlanArgs {
    PlanArgs {
        to: Some(destination.to_owned()),
        latency_ms: Some(1),
        ..PlanArgs::default()
    }
}

#[rstest]
#[case("39.95,116.45", Coord { x: 116.45, y: 39.95 })]
#[case(" 39.95 , 116.45 ", Coord { x: 116.45, y: 39.95 })]
#[case("-33.86,151.2", Coord { x: 151.2, y: -33.86 })]
fn coordinates_parse_as_lat_lon(#[case] raw: &str, #[case] expected: Coord<f64>) {
    assert_eq!(parse_coordinate(ARG_TO, raw).expect("valid pair"), expected);
}

#[rstest]
#[case("39.95")]
#[case("north,east")]
#[case("")]
fn malformed_coordinates_are_rejected(#[case] raw: &str) {
    match parse_coordinate(ARG_VIA, raw) {
        Err(CliError::InvalidCoordinate { field, value }) => {
            assert_eq!(field, ARG_VIA);
            assert_eq!(value, raw);
        }
        other => panic!("expected InvalidCoordinate, found {other:?}"),
    }
}

#[rstest]
fn converting_without_destination_errors() {
    let err = PlanConfig::try_from(PlanArgs::default()).expect_err("missing destination");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_TO);
            assert_eq!(env, ENV_TO);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn defaults_fill_an_unqualified_drive() {
    let config = PlanConfig::try_from(PlanArgs {
        to: Some("39.95,116.45".to_owned()),
        ..PlanArgs::default()
    })
    .expect("config should build");
    assert_eq!(config.request.mode, TravelMode::Drive);
    assert_eq!(config.request.origin, None);
    assert_eq!(config.request.destination, Some(Coord { x: 116.45, y: 39.95 }));
    assert_eq!(config.request.strategy, None);
    assert_eq!(config.selection, Selection::Keep);
    assert_eq!(config.navigate, None);
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
}

#[rstest]
fn via_points_keep_their_order() {
    let config = PlanConfig::try_from(PlanArgs {
        via: vec!["39.91,116.41".to_owned(), "39.92,116.42".to_owned()],
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    assert_eq!(
        config.request.waypoints,
        vec![Coord { x: 116.41, y: 39.91 }, Coord { x: 116.42, y: 39.92 }]
    );
}

#[rstest]
fn route_id_takes_priority_over_index() {
    let config = PlanConfig::try_from(PlanArgs {
        route_id: Some(13),
        route_index: Some(2),
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    assert_eq!(config.selection, Selection::ById(13));
}

#[rstest]
#[case("single", TravelPolicy::Single)]
#[case("Multiple", TravelPolicy::Multiple)]
fn travel_policy_selects_strategy(#[case] raw: &str, #[case] expected: TravelPolicy) {
    let config = PlanConfig::try_from(PlanArgs {
        mode: Some("walk".to_owned()),
        travel: Some(raw.to_owned()),
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    assert_eq!(config.request.strategy, Some(RouteStrategy::Travel(expected)));
}

#[rstest]
#[case(PlanArgs { mode: Some("hovercraft".to_owned()), ..args_to("1,2") }, ARG_MODE)]
#[case(PlanArgs { navigate: Some("teleport".to_owned()), ..args_to("1,2") }, ARG_NAVIGATE)]
#[case(PlanArgs { travel: Some("scenic".to_owned()), ..args_to("1,2") }, ARG_TRAVEL)]
#[case(
    PlanArgs { strategy: Some(4), travel: Some("single".to_owned()), ..args_to("1,2") },
    ARG_TRAVEL
)]
fn invalid_options_name_their_flag(#[case] args: PlanArgs, #[case] expected: &'static str) {
    match PlanConfig::try_from(args) {
        Err(CliError::InvalidOption { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected InvalidOption, found {other:?}"),
    }
}

#[rstest]
fn out_of_range_alternatives_are_rejected() {
    let err = PlanConfig::try_from(PlanArgs {
        alternatives: Some(5),
        ..args_to("39.95,116.45")
    })
    .expect_err("five alternatives is too many");
    assert!(matches!(
        err,
        CliError::Simulation(SimulationError::InvalidConfig { .. })
    ));
}

#[rstest]
fn single_policy_walk_reports_one_route() {
    let config = PlanConfig::try_from(PlanArgs {
        from: Some("39.90,116.40".to_owned()),
        mode: Some("walk".to_owned()),
        ..args_to("39.91,116.41")
    })
    .expect("config should build");
    let mut output = Vec::new();
    execute_plan(&config, &mut output).expect("plan succeeds");
    let report: crate::plan::PlanReport =
        serde_json::from_slice(&output).expect("JSON plan report");
    assert_eq!(report.summary.route_ids, vec![12]);
    assert_eq!(report.summary.mode, TravelMode::Walk);
}

#[rstest]
fn selecting_an_unknown_index_fails() {
    let config = PlanConfig::try_from(PlanArgs {
        route_index: Some(7),
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    let mut output = Vec::new();
    match execute_plan(&config, &mut output) {
        Err(CliError::Selection(SessionError::InvalidSelection { selection, .. })) => {
            assert_eq!(selection, Selection::ByIndex(7));
        }
        other => panic!("expected InvalidSelection, found {other:?}"),
    }
    assert!(output.is_empty());
}

#[rstest]
fn slow_engine_times_out() {
    let config = PlanConfig::try_from(PlanArgs {
        latency_ms: Some(500),
        timeout_ms: Some(10),
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    let mut output = Vec::new();
    match execute_plan(&config, &mut output) {
        Err(CliError::Timeout { mode, timeout }) => {
            assert_eq!(mode, TravelMode::Drive);
            assert_eq!(timeout, Duration::from_millis(10));
        }
        other => panic!("expected Timeout, found {other:?}"),
    }
}

#[rstest]
fn refused_strategy_surfaces_as_invalid_request() {
    let config = PlanConfig::try_from(PlanArgs {
        mode: Some("drive".to_owned()),
        travel: Some("multiple".to_owned()),
        ..args_to("39.95,116.45")
    })
    .expect("config should build");
    let mut output = Vec::new();
    assert!(matches!(
        execute_plan(&config, &mut output),
        Err(CliError::Calculation(CalculationError::InvalidRequest(_)))
    ));
}

#[rstest]
fn verbose_flag_counts_and_via_repeats() {
    let cli = Cli::try_parse_from([
        "waymark", "-vv", "plan", "--to", "1,2", "--via", "3,4", "--via", "5,6",
    ])
    .expect("arguments parse");
    assert_eq!(cli.verbose, 2);
    assert_eq!(level_for(cli.verbose), LevelFilter::DEBUG);
    match cli.command {
        Command::Plan(args) => assert_eq!(args.via, vec!["3,4", "5,6"]),
    }
}

#[rstest]
#[case(0, LevelFilter::WARN)]
#[case(1, LevelFilter::INFO)]
#[case(4, LevelFilter::DEBUG)]
fn verbosity_maps_to_levels(#[case] verbosity: u8, #[case] expected: LevelFilter) {
    assert_eq!(level_for(verbosity), expected);
}
