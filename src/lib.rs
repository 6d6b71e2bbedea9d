//! Facade crate for the Waymark route planning session manager.
//!
//! This crate re-exports the core session, calculation and launch types and,
//! behind the default `sim` feature, the simulated engines.

#![forbid(unsafe_code)]

pub use waymark_core::{
    CalculateRoute, CalculationCoordinator, CalculationError, DEFAULT_EVENT_CAPACITY,
    DEFAULT_MAX_WAYPOINTS, EMPTY_RESULT_CODE, GroupError, LaunchError, LaunchMode, LaunchRefused,
    Launcher, NavigationEngine, PlannerConfig, RequestError, ResultSink, RouteAlternative,
    RouteEvent, RouteGroup, RoutePlanner, RouteRequest, RouteStrategy, RouteSummary, RouteTicket,
    RoutingEngine, Selection, SessionError, SessionStore, StrategyFlags, Token, TravelMode,
    TravelPolicy, TruckProfile, VehicleInfo,
};

#[cfg(feature = "test-support")]
pub use waymark_core::test_support;

#[cfg(feature = "sim")]
pub use waymark_sim::{
    ActiveGuidance, SimulatedNavigationEngine, SimulatedRoutingConfig, SimulatedRoutingEngine,
    SimulationError,
};
