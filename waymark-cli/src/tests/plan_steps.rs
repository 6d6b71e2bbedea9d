//! Behaviour-driven step definitions driving the plan CLI scenarios.

use super::*;
use crate::plan::PlanReport;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use waymark_core::{CalculationError, LaunchMode, TravelMode};

#[derive(Debug, Default)]
struct PlanWorld {
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl PlanWorld {
    fn push(&self, flag: &str, value: &str) {
        self.cli_args
            .borrow_mut()
            .extend([format!("--{flag}"), value.to_owned()]);
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["waymark".to_owned(), "plan".to_owned()];
        argv.extend([format!("--{ARG_LATENCY_MS}"), "1".to_owned()]);
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn report(&self) -> PlanReport {
        let borrowed = self.result.borrow();
        borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect("expected success");
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        serde_json::from_str(&stdout).expect("output should be a JSON plan report")
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> PlanWorld {
    PlanWorld::default()
}

#[given("a drive from Tiananmen to Chaoyang")]
fn drive_across_beijing(#[from(world)] world: &PlanWorld) {
    world.push(ARG_FROM, "39.90,116.40");
    world.push(ARG_TO, "39.95,116.45");
}

#[given("I choose route index 2")]
fn choose_index(#[from(world)] world: &PlanWorld) {
    world.push(ARG_ROUTE_INDEX, "2");
}

#[given("I ask to navigate with the simulated feed")]
fn navigate_simulated(#[from(world)] world: &PlanWorld) {
    world.push(ARG_NAVIGATE, "simulated");
}

#[given("the simulated engine fails with code 6")]
fn engine_fails(#[from(world)] world: &PlanWorld) {
    world.push(ARG_FAIL_CODE, "6");
}

#[given("I omit the destination")]
fn omit_destination(#[from(world)] world: &PlanWorld) {
    world.push(ARG_FROM, "39.90,116.40");
}

#[when("I run the plan command")]
fn run_plan_command(#[from(world)] world: &PlanWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Plan(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_plan_with(args, &mut *buffer)
        }
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and prints routes 12, 13 and 14")]
fn prints_three_routes(#[from(world)] world: &PlanWorld) {
    let report = world.report();
    assert_eq!(report.summary.route_ids, vec![12, 13, 14]);
    assert_eq!(report.summary.main_index, 0);
    assert_eq!(report.summary.mode, TravelMode::Drive);
}

#[then("no navigation is reported")]
fn no_navigation(#[from(world)] world: &PlanWorld) {
    assert!(world.report().navigation.is_none());
}

#[then("the main route index is 2")]
fn main_index_two(#[from(world)] world: &PlanWorld) {
    let report = world.report();
    assert_eq!(report.summary.main_index, 2);
    let mains: Vec<bool> = report
        .summary
        .alternatives
        .iter()
        .map(waymark_core::RouteAlternative::is_main)
        .collect();
    assert_eq!(mains, vec![false, false, true]);
}

#[then("navigation is reported on route 14")]
fn navigation_on_fourteen(#[from(world)] world: &PlanWorld) {
    let navigation = world.report().navigation.expect("navigation reported");
    assert_eq!(navigation.route_id, 14);
    assert_eq!(navigation.launch_mode, LaunchMode::Simulated);
}

#[then("the command fails with engine code 6")]
fn fails_with_code(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::Calculation(CalculationError::CalculationFailed { mode, code }) => {
            assert_eq!(*mode, TravelMode::Drive);
            assert_eq!(*code, 6);
        }
        other => panic!("expected CalculationFailed, found {other:?}"),
    }
    assert!(world.stdout.borrow().is_empty());
}

#[then("the command fails because the destination is missing")]
fn fails_missing_destination(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_TO);
            assert_eq!(*env, ENV_TO);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_plan_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/plan_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: PlanWorld) {
            let _ = world;
        }
    };
}

register_plan_scenario!(plan_drive_route, "planning a drive route");
register_plan_scenario!(plan_select_and_navigate, "choosing a route and navigating it");
register_plan_scenario!(plan_engine_failure, "reporting an engine failure");
register_plan_scenario!(plan_missing_destination, "rejecting a missing destination");
