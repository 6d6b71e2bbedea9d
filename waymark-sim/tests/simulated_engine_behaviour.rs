//! Behavioural tests running the planner against the simulated engines.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::sync::broadcast;
use waymark_core::{
    CalculateRoute, CalculationError, LaunchError, LaunchMode, RouteEvent, RoutePlanner,
    RouteSummary, Selection, TravelMode,
};
use waymark_sim::{SimulatedNavigationEngine, SimulatedRoutingConfig, SimulatedRoutingEngine};

#[derive(Default)]
struct SimWorld {
    planner: RefCell<Option<RoutePlanner>>,
    events: RefCell<Option<broadcast::Receiver<RouteEvent>>>,
    outcome: RefCell<Option<Result<RouteSummary, CalculationError>>>,
    launches: RefCell<Vec<Result<(), LaunchError>>>,
}

impl SimWorld {
    fn start(&self, config: SimulatedRoutingConfig) {
        let routing = SimulatedRoutingEngine::new(config.with_latency(Duration::from_millis(5)))
            .expect("simulated engine starts");
        let planner = RoutePlanner::new(
            Arc::new(routing),
            Arc::new(SimulatedNavigationEngine::new()),
        );
        *self.events.borrow_mut() = Some(planner.subscribe());
        *self.planner.borrow_mut() = Some(planner);
    }

    fn with_planner<T>(&self, f: impl FnOnce(&RoutePlanner) -> T) -> T {
        let planner = self.planner.borrow();
        f(planner.as_ref().expect("planner started"))
    }

    fn summary(&self) -> RouteSummary {
        self.outcome
            .borrow()
            .clone()
            .expect("calculation attempted")
            .expect("calculation succeeded")
    }
}

#[fixture]
fn world() -> SimWorld {
    SimWorld::default()
}

#[given("a planner backed by the simulated engines")]
fn given_simulated(#[from(world)] world: &SimWorld) {
    world.start(SimulatedRoutingConfig::default());
}

#[given("a planner whose simulated engine fails with code 6")]
fn given_failing(#[from(world)] world: &SimWorld) {
    world.start(SimulatedRoutingConfig::default().with_failure_code(6));
}

#[given("a planner whose simulated engine refuses submissions")]
fn given_refusing(#[from(world)] world: &SimWorld) {
    world.start(SimulatedRoutingConfig::default().rejecting_submissions());
}

#[when("a drive route across Beijing is calculated")]
fn calculate_drive(#[from(world)] world: &SimWorld) {
    let request = CalculateRoute::new(TravelMode::Drive)
        .with_origin(Coord { x: 116.40, y: 39.90 })
        .with_destination(Coord { x: 116.45, y: 39.95 });
    let outcome =
        world.with_planner(|planner| planner.calculate(&request).and_then(|t| t.wait_blocking()));
    *world.outcome.borrow_mut() = Some(outcome);
}

#[when("navigation starts on the main route")]
fn navigate_main(#[from(world)] world: &SimWorld) {
    let token = world.summary().token;
    let outcome = world.with_planner(|planner| {
        planner.start_navigation(token, LaunchMode::Simulated, Selection::Keep)
    });
    world.launches.borrow_mut().push(outcome);
}

#[when("navigation starts again on route index 1")]
fn navigate_again(#[from(world)] world: &SimWorld) {
    let token = world.summary().token;
    let outcome = world.with_planner(|planner| {
        planner.start_navigation(token, LaunchMode::Gps, Selection::ByIndex(1))
    });
    world.launches.borrow_mut().push(outcome);
}

#[then("routes 12, 13 and 14 are returned")]
fn then_routes(#[from(world)] world: &SimWorld) {
    let summary = world.summary();
    assert_eq!(summary.route_ids, vec![12, 13, 14]);
    assert_eq!(summary.main_index, 0);
}

#[then("the calculated session is stored")]
fn then_stored(#[from(world)] world: &SimWorld) {
    let token = world.summary().token;
    world.with_planner(|planner| assert_eq!(planner.store().tokens(), vec![token]));
}

#[then("the calculation fails with code 6")]
fn then_fails(#[from(world)] world: &SimWorld) {
    assert_eq!(
        *world.outcome.borrow(),
        Some(Err(CalculationError::CalculationFailed {
            mode: TravelMode::Drive,
            code: 6
        }))
    );
}

#[then("a route-failed event is published")]
fn then_failed_event(#[from(world)] world: &SimWorld) {
    let mut events = world.events.borrow_mut();
    let receiver = events.as_mut().expect("subscribed");
    let event = receiver.blocking_recv().expect("event delivered");
    assert_eq!(
        event,
        RouteEvent::Failed {
            mode: TravelMode::Drive,
            code: 6
        }
    );
}

#[then("the calculation is rejected by the engine")]
fn then_rejected(#[from(world)] world: &SimWorld) {
    assert_eq!(
        *world.outcome.borrow(),
        Some(Err(CalculationError::EngineRejected(TravelMode::Drive)))
    );
}

#[then("no drive calculation is pending")]
fn then_not_pending(#[from(world)] world: &SimWorld) {
    world.with_planner(|planner| assert!(!planner.coordinator().is_pending(TravelMode::Drive)));
}

#[then("the second launch fails because guidance is already running")]
fn then_conflict(#[from(world)] world: &SimWorld) {
    let launches = world.launches.borrow();
    assert!(matches!(launches.first(), Some(Ok(()))));
    assert!(matches!(
        launches.get(1),
        Some(Err(LaunchError::LaunchFailed { reason, .. })) if reason.contains("already running")
    ));
}

#[scenario(path = "tests/features/simulated_engines.feature", index = 0)]
fn drive_resolves_from_worker(world: SimWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/simulated_engines.feature", index = 1)]
fn failure_reaches_caller(world: SimWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/simulated_engines.feature", index = 2)]
fn refusal_frees_slot(world: SimWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/simulated_engines.feature", index = 3)]
fn second_launch_conflicts(world: SimWorld) {
    let _ = world;
}
