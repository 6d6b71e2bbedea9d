//! Configuration for the simulated routing engine.

use std::time::Duration;

use geo::Coord;
use thiserror::Error;

/// Default delay before the worker answers a request.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(50);
/// Engine id given to the first alternative of every result.
pub const DEFAULT_ROUTE_ID_BASE: i64 = 12;
/// Most alternatives the simulation will produce.
pub const MAX_ALTERNATIVES: u8 = 3;

/// Errors raised while starting a simulated engine.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration was out of range.
    #[error("invalid simulation config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
    /// The worker thread could not be started.
    #[error("failed to spawn routing worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Behaviour of a [`SimulatedRoutingEngine`](crate::SimulatedRoutingEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedRoutingConfig {
    /// Delay between receiving a request and answering it.
    pub latency: Duration,
    /// Alternatives produced for multi-route requests, from 1 to 3.
    pub alternatives: u8,
    /// When set, every calculation fails with this engine code.
    pub failure_code: Option<i32>,
    /// Refuse every submission outright.
    pub reject_submissions: bool,
    /// Engine id of the first alternative; later ones count up from it.
    pub route_id_base: i64,
    /// Position used when a request has no origin.
    pub current_position: Coord<f64>,
}

impl Default for SimulatedRoutingConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            alternatives: MAX_ALTERNATIVES,
            failure_code: None,
            reject_submissions: false,
            route_id_base: DEFAULT_ROUTE_ID_BASE,
            current_position: Coord {
                x: 116.397_128,
                y: 39.916_527,
            },
        }
    }
}

impl SimulatedRoutingConfig {
    /// Set the answer delay.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the number of alternatives for multi-route requests.
    #[must_use]
    pub const fn with_alternatives(mut self, alternatives: u8) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Fail every calculation with `code`.
    #[must_use]
    pub const fn with_failure_code(mut self, code: i32) -> Self {
        self.failure_code = Some(code);
        self
    }

    /// Refuse every submission.
    #[must_use]
    pub const fn rejecting_submissions(mut self) -> Self {
        self.reject_submissions = true;
        self
    }

    /// Set the engine id of the first alternative.
    #[must_use]
    pub const fn with_route_id_base(mut self, base: i64) -> Self {
        self.route_id_base = base;
        self
    }

    /// Set the position used for requests without an origin.
    #[must_use]
    pub const fn with_current_position(mut self, position: Coord<f64>) -> Self {
        self.current_position = position;
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidConfig`] when the alternative count
    /// is outside 1 to 3 or the current position is not finite.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(1..=MAX_ALTERNATIVES).contains(&self.alternatives) {
            return Err(SimulationError::InvalidConfig {
                reason: format!(
                    "alternatives must be between 1 and {MAX_ALTERNATIVES}, got {}",
                    self.alternatives
                ),
            });
        }
        if !self.current_position.x.is_finite() || !self.current_position.y.is_finite() {
            return Err(SimulationError::InvalidConfig {
                reason: "current position must be finite".to_owned(),
            });
        }
        Ok(())
    }
}
