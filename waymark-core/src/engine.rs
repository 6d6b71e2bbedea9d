//! Seams to the external routing and navigation engines.
//!
//! The engines are black boxes: the routing engine computes alternatives
//! and reports back through a [`ResultSink`], possibly from its own thread
//! and long after [`RoutingEngine::submit`] returned. The navigation engine
//! starts turn-by-turn guidance on a chosen alternative.

use thiserror::Error;

use crate::{LaunchMode, ResultSink, RouteAlternative, RouteGroup, RouteRequest};

/// Computes routes on behalf of the coordinator.
///
/// Implementations must be `Send + Sync`; callbacks may be delivered from
/// any thread, including synchronously from inside [`submit`](Self::submit).
///
/// # Examples
/// ```
/// use waymark_core::{ResultSink, RouteAlternative, RouteRequest, RoutingEngine};
///
/// struct Straight;
///
/// impl RoutingEngine for Straight {
///     fn submit(&self, _request: RouteRequest, sink: ResultSink) -> bool {
///         sink.succeed(vec![RouteAlternative::new(12, 1_000.0, 60.0)]);
///         true
///     }
/// }
/// ```
pub trait RoutingEngine: Send + Sync {
    /// Start calculating `request`, reporting the outcome through `sink`.
    ///
    /// Returns `false` if the engine refuses the request outright, in which
    /// case it must not use `sink`. Calls after a refusal are dropped.
    fn submit(&self, request: RouteRequest, sink: ResultSink) -> bool;
}

/// Reason the navigation engine gave for refusing to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct LaunchRefused {
    /// Diagnostic supplied by the engine.
    pub reason: String,
}

impl LaunchRefused {
    /// Wrap an engine diagnostic.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Starts turn-by-turn guidance.
pub trait NavigationEngine: Send + Sync {
    /// Begin navigating `route`, the current main alternative of `group`.
    ///
    /// # Errors
    /// Returns [`LaunchRefused`] when guidance cannot start, for example
    /// because the engine is not initialised or another session is active.
    fn launch(
        &self,
        route: &RouteAlternative,
        group: &RouteGroup,
        mode: LaunchMode,
    ) -> Result<(), LaunchRefused>;
}
