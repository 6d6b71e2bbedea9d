//! A navigation engine that tracks one active guidance session.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use waymark_core::{
    LaunchMode, LaunchRefused, NavigationEngine, RouteAlternative, RouteGroup, Token,
};

/// The guidance session a [`SimulatedNavigationEngine`] is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveGuidance {
    /// Session the route came from.
    pub token: Token,
    /// Engine id of the route being followed.
    pub route_id: i64,
    /// Position feed in use.
    pub mode: LaunchMode,
}

/// Simulated turn-by-turn engine.
///
/// Only one guidance session runs at a time; launching while one is active
/// is refused until [`stop`](Self::stop) is called. An uninitialised engine
/// refuses everything.
#[derive(Debug)]
pub struct SimulatedNavigationEngine {
    initialised: bool,
    active: Mutex<Option<ActiveGuidance>>,
}

impl Default for SimulatedNavigationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNavigationEngine {
    /// Create a ready engine with no active session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialised: true,
            active: Mutex::new(None),
        }
    }

    /// Create an engine that was never initialised.
    #[must_use]
    pub const fn uninitialised() -> Self {
        Self {
            initialised: false,
            active: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveGuidance>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The running session, if any.
    #[must_use]
    pub fn active(&self) -> Option<ActiveGuidance> {
        *self.lock()
    }

    /// End the running session, returning it.
    pub fn stop(&self) -> Option<ActiveGuidance> {
        let stopped = self.lock().take();
        if let Some(guidance) = stopped {
            debug!("stopped guidance on route {}", guidance.route_id);
        }
        stopped
    }
}

impl NavigationEngine for SimulatedNavigationEngine {
    fn launch(
        &self,
        route: &RouteAlternative,
        group: &RouteGroup,
        mode: LaunchMode,
    ) -> Result<(), LaunchRefused> {
        if !self.initialised {
            return Err(LaunchRefused::new("navigation engine is not initialised"));
        }
        let mut active = self.lock();
        if let Some(current) = *active {
            return Err(LaunchRefused::new(format!(
                "guidance already running on route {} of session {}",
                current.route_id, current.token
            )));
        }
        *active = Some(ActiveGuidance {
            token: group.token(),
            route_id: route.route_id,
            mode,
        });
        debug!("started {mode} guidance on route {}", route.route_id);
        Ok(())
    }
}
