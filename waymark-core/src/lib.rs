//! Independent route planning sessions for the Waymark engine bindings.
//!
//! A calculation produces a [`RouteGroup`] of alternatives stored under an
//! opaque [`Token`]. Callers then pick the main alternative, optionally
//! start turn-by-turn navigation on it, and release the session when done.
//! None of this touches an active navigation session until
//! [`RoutePlanner::start_navigation`] is called.
//!
//! The routing and navigation engines themselves are external; they are
//! reached through the [`RoutingEngine`] and [`NavigationEngine`] traits.
//! Results arrive asynchronously through a [`ResultSink`] and are
//! correlated per [`TravelMode`]: at most one calculation is in flight per
//! mode.

#![forbid(unsafe_code)]

mod coordinator;
mod engine;
mod events;
mod launch;
mod mode;
mod planner;
mod request;
mod route;
mod selection;
mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
mod token;

pub use coordinator::{
    CalculationCoordinator, CalculationError, EMPTY_RESULT_CODE, ResultSink, RouteTicket,
};
pub use engine::{LaunchRefused, NavigationEngine, RoutingEngine};
pub use events::RouteEvent;
pub use launch::{LaunchError, Launcher};
pub use mode::{LaunchMode, TravelMode};
pub use planner::{DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_WAYPOINTS, PlannerConfig, RoutePlanner};
pub use request::{
    CalculateRoute, RequestError, RouteRequest, RouteStrategy, StrategyFlags, TravelPolicy,
    TruckProfile, VehicleInfo,
};
pub use route::{GroupError, RouteAlternative, RouteGroup, RouteSummary};
pub use selection::Selection;
pub use store::{SessionError, SessionStore};
pub use token::Token;
