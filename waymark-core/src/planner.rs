//! The caller-facing facade tying the store, coordinator and launcher together.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::broadcast;

use crate::{
    CalculateRoute, CalculationCoordinator, CalculationError, LaunchError, LaunchMode, Launcher,
    NavigationEngine, RouteEvent, RouteTicket, RoutingEngine, Selection, SessionError,
    SessionStore, Token,
};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
/// Default waypoint limit, matching common engine limits.
pub const DEFAULT_MAX_WAYPOINTS: usize = 16;

/// Tunables for a [`RoutePlanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Events buffered per subscriber before slow observers start missing them.
    pub event_capacity: usize,
    /// Maximum number of waypoints a request may carry.
    pub max_waypoints: usize,
    /// Sessions untouched for this long are released by
    /// [`RoutePlanner::sweep_idle`]. `None` keeps them until released.
    pub session_idle_timeout: Option<Duration>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_waypoints: DEFAULT_MAX_WAYPOINTS,
            session_idle_timeout: None,
        }
    }
}

impl PlannerConfig {
    /// Set the event channel capacity. Zero is raised to one.
    #[must_use]
    pub const fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Set the waypoint limit.
    #[must_use]
    pub const fn with_max_waypoints(mut self, max_waypoints: usize) -> Self {
        self.max_waypoints = max_waypoints;
        self
    }

    /// Release sessions idle for at least `timeout` when sweeping.
    #[must_use]
    pub const fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = Some(timeout);
        self
    }
}

/// Independent route planning: calculate, choose, navigate, release.
///
/// Calculations never disturb an active navigation session; only
/// [`start_navigation`](Self::start_navigation) reaches the navigation
/// engine.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use geo::Coord;
/// use waymark_core::{
///     CalculateRoute, LaunchMode, LaunchRefused, NavigationEngine, ResultSink,
///     RouteAlternative, RouteGroup, RoutePlanner, RouteRequest, RoutingEngine, Selection,
///     TravelMode,
/// };
///
/// struct TwoRoutes;
///
/// impl RoutingEngine for TwoRoutes {
///     fn submit(&self, _request: RouteRequest, sink: ResultSink) -> bool {
///         sink.succeed(vec![
///             RouteAlternative::new(12, 5_000.0, 600.0),
///             RouteAlternative::new(13, 5_400.0, 560.0),
///         ]);
///         true
///     }
/// }
///
/// struct Guidance;
///
/// impl NavigationEngine for Guidance {
///     fn launch(
///         &self,
///         route: &RouteAlternative,
///         _group: &RouteGroup,
///         _mode: LaunchMode,
///     ) -> Result<(), LaunchRefused> {
///         assert_eq!(route.route_id, 13);
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let planner = RoutePlanner::new(Arc::new(TwoRoutes), Arc::new(Guidance));
/// let request = CalculateRoute::new(TravelMode::Drive)
///     .with_origin(Coord { x: 116.40, y: 39.90 })
///     .with_destination(Coord { x: 116.45, y: 39.95 });
/// let summary = planner.calculate(&request)?.wait_blocking()?;
/// planner.start_navigation(summary.token, LaunchMode::Gps, Selection::ById(13))?;
/// assert!(planner.release(summary.token));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RoutePlanner {
    store: Arc<SessionStore>,
    coordinator: CalculationCoordinator,
    launcher: Launcher,
    config: PlannerConfig,
}

impl RoutePlanner {
    /// Create a planner with the default configuration.
    #[must_use]
    pub fn new(routing: Arc<dyn RoutingEngine>, navigation: Arc<dyn NavigationEngine>) -> Self {
        Self::with_config(routing, navigation, PlannerConfig::default())
    }

    /// Create a planner with an explicit configuration.
    #[must_use]
    pub fn with_config(
        routing: Arc<dyn RoutingEngine>,
        navigation: Arc<dyn NavigationEngine>,
        config: PlannerConfig,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let coordinator = CalculationCoordinator::new(Arc::clone(&store), routing, &config);
        let launcher = Launcher::new(Arc::clone(&store), navigation);
        Self {
            store,
            coordinator,
            launcher,
            config,
        }
    }

    /// Start a calculation; see [`CalculationCoordinator::request_route`].
    ///
    /// # Errors
    /// Returns [`CalculationError`] when the request is invalid, the mode is
    /// busy or the engine refuses it.
    pub fn calculate(&self, request: &CalculateRoute) -> Result<RouteTicket, CalculationError> {
        self.coordinator.request_route(request)
    }

    /// Choose the main route of a session.
    ///
    /// # Errors
    /// Returns [`SessionError`] for unknown tokens or unmatched selectors.
    pub fn select(&self, token: Token, selection: Selection) -> Result<(), SessionError> {
        self.launcher.select(token, selection)
    }

    /// Apply `selection` and navigate the resulting main route.
    ///
    /// # Errors
    /// See [`Launcher::start_navigation`].
    pub fn start_navigation(
        &self,
        token: Token,
        mode: LaunchMode,
        selection: Selection,
    ) -> Result<(), LaunchError> {
        self.launcher.start_navigation(token, mode, selection)
    }

    /// Release one session. Returns whether it existed.
    pub fn release(&self, token: Token) -> bool {
        self.launcher.release(token)
    }

    /// Cancel every pending calculation and drop every session.
    ///
    /// Waiting callers observe [`CalculationError::Cancelled`]. Token
    /// numbering restarts, so no previously issued token may be used again.
    /// See [`CalculationCoordinator::cancel_all_and_clear`].
    pub fn release_all(&self) {
        let cancelled = self.coordinator.cancel_all_and_clear();
        debug!("released all sessions ({cancelled} pending calculations cancelled)");
    }

    /// Release sessions idle past the configured timeout.
    ///
    /// Returns the released tokens; always empty without a timeout.
    pub fn sweep_idle(&self) -> Vec<Token> {
        self.config
            .session_idle_timeout
            .map_or_else(Vec::new, |timeout| self.store.release_idle(timeout))
    }

    /// Subscribe to calculation events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RouteEvent> {
        self.coordinator.subscribe()
    }

    /// The session store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The calculation coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &CalculationCoordinator {
        &self.coordinator
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TravelMode;
    use crate::test_support::{
        RecordingNavigationEngine, RecordingRoutingEngine, ScriptedRoutingEngine,
        sample_alternatives,
    };
    use geo::Coord;
    use rstest::rstest;

    fn request(mode: TravelMode) -> CalculateRoute {
        CalculateRoute::new(mode).with_destination(Coord { x: 116.45, y: 39.95 })
    }

    #[rstest]
    fn config_builders_override_defaults() {
        let config = PlannerConfig::default()
            .with_event_capacity(8)
            .with_max_waypoints(4)
            .with_session_idle_timeout(Duration::from_secs(30));
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.max_waypoints, 4);
        assert_eq!(config.session_idle_timeout, Some(Duration::from_secs(30)));
    }

    #[rstest]
    fn max_waypoints_reaches_validation() {
        let planner = RoutePlanner::with_config(
            Arc::new(RecordingRoutingEngine::new()),
            Arc::new(RecordingNavigationEngine::new()),
            PlannerConfig::default().with_max_waypoints(0),
        );
        let err = planner
            .calculate(&request(TravelMode::Drive).with_waypoint(Coord { x: 116.42, y: 39.92 }))
            .expect_err("request rejected");
        assert!(matches!(err, CalculationError::InvalidRequest(_)));
    }

    #[rstest]
    fn release_all_cancels_and_clears() {
        let planner = RoutePlanner::new(
            Arc::new(RecordingRoutingEngine::new()),
            Arc::new(RecordingNavigationEngine::new()),
        );
        let ticket = planner.calculate(&request(TravelMode::Walk)).expect("request accepted");
        planner.release_all();
        assert_eq!(
            ticket.wait_blocking(),
            Err(CalculationError::Cancelled(TravelMode::Walk))
        );
        assert!(planner.store().is_empty());
        assert!(planner.coordinator().pending_modes().is_empty());
    }

    #[rstest]
    fn sweep_idle_needs_a_timeout() {
        let planner = RoutePlanner::new(
            Arc::new(ScriptedRoutingEngine::succeeding(sample_alternatives())),
            Arc::new(RecordingNavigationEngine::new()),
        );
        let summary = planner
            .calculate(&request(TravelMode::Drive))
            .expect("request accepted")
            .wait_blocking()
            .expect("calculation succeeds");
        assert!(planner.sweep_idle().is_empty());
        assert_eq!(planner.store().tokens(), vec![summary.token]);
    }

    #[rstest]
    fn sweep_idle_releases_expired_sessions() {
        let planner = RoutePlanner::with_config(
            Arc::new(ScriptedRoutingEngine::succeeding(sample_alternatives())),
            Arc::new(RecordingNavigationEngine::new()),
            PlannerConfig::default().with_session_idle_timeout(Duration::ZERO),
        );
        let summary = planner
            .calculate(&request(TravelMode::Drive))
            .expect("request accepted")
            .wait_blocking()
            .expect("calculation succeeds");
        assert_eq!(planner.sweep_idle(), vec![summary.token]);
        assert!(planner.store().is_empty());
    }
}
