//! A routing engine that answers from its own worker thread.
//!
//! Results are derived from great-circle distances between the request's
//! points, so they are deterministic and plausible without a road graph.
//! Answers always arrive on the worker thread, never inside `submit`.

use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use geo::{Coord, Distance, Haversine, LineString, Point};
use log::{debug, warn};
use waymark_core::{
    ResultSink, RouteAlternative, RouteRequest, RouteStrategy, RoutingEngine, StrategyFlags,
    TravelMode, TravelPolicy,
};

use crate::{SimulatedRoutingConfig, SimulationError};

struct Job {
    request: RouteRequest,
    sink: ResultSink,
}

/// Simulated engine delivering results out of band.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use geo::Coord;
/// use waymark_core::test_support::RecordingNavigationEngine;
/// use waymark_core::{CalculateRoute, RoutePlanner, TravelMode};
/// use waymark_sim::{SimulatedRoutingConfig, SimulatedRoutingEngine};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SimulatedRoutingEngine::new(
///     SimulatedRoutingConfig::default().with_latency(Duration::ZERO),
/// )?;
/// let planner = RoutePlanner::new(Arc::new(engine), Arc::new(RecordingNavigationEngine::new()));
/// let request = CalculateRoute::new(TravelMode::Drive)
///     .with_origin(Coord { x: 116.40, y: 39.90 })
///     .with_destination(Coord { x: 116.45, y: 39.95 });
/// let summary = planner.calculate(&request)?.wait_blocking()?;
/// assert_eq!(summary.route_ids, vec![12, 13, 14]);
/// # Ok(())
/// # }
/// ```
pub struct SimulatedRoutingEngine {
    config: SimulatedRoutingConfig,
    jobs: Mutex<Option<Sender<Job>>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SimulatedRoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRoutingEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SimulatedRoutingEngine {
    /// Validate `config` and start the worker thread.
    ///
    /// # Errors
    /// Returns [`SimulationError`] for an invalid configuration or when the
    /// worker cannot be spawned.
    pub fn new(config: SimulatedRoutingConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let (jobs, inbox) = mpsc::channel::<Job>();
        let worker_config = config.clone();
        let worker = thread::Builder::new()
            .name("waymark-sim-routing".to_owned())
            .spawn(move || {
                for job in inbox {
                    answer(&worker_config, &job);
                }
                debug!("simulated routing worker stopped");
            })?;
        Ok(Self {
            config,
            jobs: Mutex::new(Some(jobs)),
            worker: Some(worker),
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulatedRoutingConfig {
        &self.config
    }
}

impl RoutingEngine for SimulatedRoutingEngine {
    fn submit(&self, request: RouteRequest, sink: ResultSink) -> bool {
        if self.config.reject_submissions {
            debug!("simulated engine refusing {} request", request.mode);
            return false;
        }
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = jobs.as_ref() else {
            return false;
        };
        sender.send(Job { request, sink }).is_ok()
    }
}

impl Drop for SimulatedRoutingEngine {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once queued jobs drain.
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("simulated routing worker panicked");
        }
    }
}

fn answer(config: &SimulatedRoutingConfig, job: &Job) {
    if !config.latency.is_zero() {
        thread::sleep(config.latency);
    }
    let mode = job.request.mode;
    if let Some(code) = config.failure_code {
        debug!("simulated {mode} calculation failing with code {code}");
        job.sink.fail(code);
        return;
    }
    let routes = plan(config, &job.request);
    debug!("simulated {mode} calculation produced {} routes", routes.len());
    job.sink.succeed(routes);
}

/// Build the alternatives the simulation returns for `request`.
pub(crate) fn plan(
    config: &SimulatedRoutingConfig,
    request: &RouteRequest,
) -> Vec<RouteAlternative> {
    let path = path_of(config, request);
    let base_distance = path_length(&path);
    let strategy = strategy_code(request.strategy);
    (0..alternative_count(config, request))
        .map(|rank| alternative(config, request.mode, &path, base_distance, rank, strategy))
        .collect()
}

fn path_of(config: &SimulatedRoutingConfig, request: &RouteRequest) -> Vec<Coord<f64>> {
    let mut path = Vec::with_capacity(request.waypoints.len() + 2);
    path.push(request.origin.unwrap_or(config.current_position));
    path.extend(request.waypoints.iter().copied());
    path.push(request.destination);
    path
}

fn path_length(path: &[Coord<f64>]) -> f64 {
    path.windows(2)
        .filter_map(|pair| match pair {
            [from, to] => Some(Haversine.distance(Point::from(*from), Point::from(*to))),
            _ => None,
        })
        .sum()
}

const fn alternative_count(config: &SimulatedRoutingConfig, request: &RouteRequest) -> u8 {
    match request.strategy {
        RouteStrategy::Travel(TravelPolicy::Single) => 1,
        _ => config.alternatives,
    }
}

/// Code reported for flag strategies: 10 plus one bit per preference.
fn strategy_code(strategy: RouteStrategy) -> i32 {
    match strategy {
        RouteStrategy::Flags(flags) => flags_code(flags),
        other => other.code().unwrap_or_default(),
    }
}

const fn flags_code(flags: StrategyFlags) -> i32 {
    let mut bits = 0;
    if flags.avoid_congestion {
        bits |= 1;
    }
    if flags.avoid_highway {
        bits |= 2;
    }
    if flags.avoid_cost {
        bits |= 4;
    }
    if flags.prioritise_highway {
        bits |= 8;
    }
    10 + bits
}

/// Cruising speed in meters per second.
const fn speed_for(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Drive => 11.1,
        TravelMode::Truck => 9.7,
        TravelMode::Motorcycle => 10.0,
        TravelMode::EBike => 5.5,
        TravelMode::Ride => 4.2,
        TravelMode::Walk => 1.4,
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "alternative metrics scale the base distance by bounded factors"
)]
fn alternative(
    config: &SimulatedRoutingConfig,
    mode: TravelMode,
    path: &[Coord<f64>],
    base_distance: f64,
    rank: u8,
    strategy: i32,
) -> RouteAlternative {
    let rank_f = f64::from(rank);
    // Later alternatives are longer but use faster roads.
    let distance = base_distance * (1.0 + 0.08 * rank_f);
    let speed = speed_for(mode) * (1.0 + 0.06 * rank_f);
    let duration = distance / speed;
    let route_id = config.route_id_base.saturating_add(i64::from(rank));
    let polyline = detour(path, rank_f * 0.002);
    let base = RouteAlternative::new(route_id, distance, duration)
        .with_strategy(strategy)
        .with_polyline(polyline);
    if !mode.is_motorised() {
        return base;
    }
    let lights = (distance / 400.0).floor() as u32;
    let lit = base.with_traffic_lights(lights);
    if rank == 0 {
        return lit;
    }
    let toll_distance = distance * 0.3;
    let toll_cost = (toll_distance / 1_000.0 * 50.0).round() as u64;
    lit.with_toll(toll_cost, toll_distance)
}

/// Copy `path`, inserting a midpoint shifted north by `offset` degrees into
/// every segment so alternatives have distinct geometry.
#[expect(
    clippy::float_arithmetic,
    reason = "detour midpoints are shifted by the offset"
)]
fn detour(path: &[Coord<f64>], offset: f64) -> LineString<f64> {
    let mut coords = Vec::with_capacity(path.len() * 2);
    for pair in path.windows(2) {
        if let [from, to] = pair {
            coords.push(*from);
            if offset > 0.0 {
                coords.push(Coord {
                    x: f64::midpoint(from.x, to.x),
                    y: f64::midpoint(from.y, to.y) + offset,
                });
            }
        }
    }
    if let Some(last) = path.last() {
        coords.push(*last);
    }
    LineString::new(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use waymark_core::CalculateRoute;

    #[fixture]
    fn config() -> SimulatedRoutingConfig {
        SimulatedRoutingConfig::default()
    }

    fn request(mode: TravelMode) -> RouteRequest {
        CalculateRoute::new(mode)
            .with_origin(Coord { x: 116.40, y: 39.90 })
            .with_destination(Coord { x: 116.45, y: 39.95 })
            .validate(16)
            .expect("valid request")
    }

    #[rstest]
    fn drive_yields_three_ascending_ids(config: SimulatedRoutingConfig) {
        let routes = plan(&config, &request(TravelMode::Drive));
        let ids: Vec<i64> = routes.iter().map(|r| r.route_id).collect();
        assert_eq!(ids, vec![12, 13, 14]);
        assert!(routes.iter().all(|r| r.distance_m > 6_000.0 && r.distance_m < 9_000.0));
        assert_eq!(routes.first().map(|r| r.toll_cost), Some(0));
        assert!(routes.iter().skip(1).all(|r| r.toll_cost > 0));
    }

    #[rstest]
    fn single_travel_policy_yields_one_route(config: SimulatedRoutingConfig) {
        let routes = plan(&config, &request(TravelMode::Walk));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes.first().and_then(|r| r.strategy), Some(1000));
        assert_eq!(routes.first().map(|r| r.toll_cost), Some(0));
    }

    #[rstest]
    fn multiple_travel_policy_uses_configured_count(config: SimulatedRoutingConfig) {
        let mut parsed = request(TravelMode::Ride);
        parsed.strategy = RouteStrategy::Travel(TravelPolicy::Multiple);
        let routes = plan(&config.with_alternatives(2), &parsed);
        assert_eq!(routes.len(), 2);
    }

    #[rstest]
    fn missing_origin_uses_current_position(config: SimulatedRoutingConfig) {
        let mut parsed = request(TravelMode::Drive);
        parsed.origin = None;
        let path = path_of(&config, &parsed);
        assert_eq!(path.first(), Some(&config.current_position));
    }

    #[rstest]
    fn waypoints_lengthen_the_route(config: SimulatedRoutingConfig) {
        let direct = plan(&config, &request(TravelMode::Drive));
        let mut via = request(TravelMode::Drive);
        via.waypoints.push(Coord { x: 116.30, y: 40.00 });
        let detoured = plan(&config, &via);
        assert!(detoured.first().map(|r| r.distance_m) > direct.first().map(|r| r.distance_m));
    }

    #[rstest]
    #[case(StrategyFlags::default(), 10)]
    #[case(
        StrategyFlags { avoid_congestion: true, avoid_cost: true, ..StrategyFlags::default() },
        15
    )]
    fn flags_map_to_codes(#[case] flags: StrategyFlags, #[case] expected: i32) {
        assert_eq!(strategy_code(RouteStrategy::Flags(flags)), expected);
    }

    #[rstest]
    fn detour_keeps_endpoints() {
        let path = [Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }];
        let line = detour(&path, 0.002);
        let coords: Vec<_> = line.coords().copied().collect();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords.first(), path.first());
        assert_eq!(coords.last(), path.last());
        let midpoint = coords.get(1).expect("detour point");
        assert_eq!(midpoint.x, 0.5);
        assert!(midpoint.y > 0.5);
    }

    #[rstest]
    fn motorised_alternatives_carry_lights_and_tolls(config: SimulatedRoutingConfig) {
        let routes = plan(&config, &request(TravelMode::Truck));
        assert!(routes.iter().all(|r| r.traffic_lights > 0));
        assert_eq!(routes.first().map(|r| r.toll_cost), Some(0));
        let walk = plan(&config, &request(TravelMode::Walk));
        assert!(walk.iter().all(|r| r.traffic_lights == 0 && r.toll_cost == 0));
    }
}
