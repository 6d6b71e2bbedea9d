//! Simulated routing and navigation engines for Waymark.
//!
//! These engines stand in for a vendor SDK in demos and tests. The routing
//! engine answers from a worker thread after a configurable latency, which
//! exercises the same out-of-band callback path a real engine uses.

#![forbid(unsafe_code)]

mod config;
mod navigation;
mod routing;

pub use config::{
    DEFAULT_LATENCY, DEFAULT_ROUTE_ID_BASE, MAX_ALTERNATIVES, SimulatedRoutingConfig,
    SimulationError,
};
pub use navigation::{ActiveGuidance, SimulatedNavigationEngine};
pub use routing::SimulatedRoutingEngine;
