//! In-memory engine doubles used by unit and behaviour tests.
//!
//! Compiled for this crate's own tests and, for dependants, behind the
//! `test-support` feature.
//!
//! None of these compute real routes. They record what the coordinator and
//! launcher hand them and let the test decide when and how to answer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    LaunchMode, LaunchRefused, NavigationEngine, ResultSink, RouteAlternative, RouteGroup,
    RouteRequest, RoutingEngine, Token, TravelMode,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Three alternatives with engine ids 12, 13 and 14.
#[must_use]
pub fn sample_alternatives() -> Vec<RouteAlternative> {
    vec![
        RouteAlternative::new(12, 5_200.0, 780.0).with_traffic_lights(9),
        RouteAlternative::new(13, 5_900.0, 720.0).with_toll(500, 1_800.0),
        RouteAlternative::new(14, 6_400.0, 690.0).with_toll(1_200, 4_100.0),
    ]
}

/// Routing engine that accepts every request and never answers on its own.
///
/// Tests answer through the recorded [`ResultSink`]s, from any thread.
#[derive(Debug, Default)]
pub struct RecordingRoutingEngine {
    submitted: Mutex<Vec<(RouteRequest, ResultSink)>>,
}

impl RecordingRoutingEngine {
    /// Create an engine with no recorded submissions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received.
    #[must_use]
    pub fn submissions(&self) -> usize {
        lock(&self.submitted).len()
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RouteRequest> {
        lock(&self.submitted)
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    /// Sink of the most recent request.
    #[must_use]
    pub fn last_sink(&self) -> Option<ResultSink> {
        lock(&self.submitted).last().map(|(_, sink)| sink.clone())
    }

    /// Sink of the most recent request for `mode`.
    #[must_use]
    pub fn sink_for(&self, mode: TravelMode) -> Option<ResultSink> {
        lock(&self.submitted)
            .iter()
            .rev()
            .find(|(request, _)| request.mode == mode)
            .map(|(_, sink)| sink.clone())
    }
}

impl RoutingEngine for RecordingRoutingEngine {
    fn submit(&self, request: RouteRequest, sink: ResultSink) -> bool {
        lock(&self.submitted).push((request, sink));
        true
    }
}

/// Routing engine that refuses every submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefusingRoutingEngine;

impl RoutingEngine for RefusingRoutingEngine {
    fn submit(&self, _request: RouteRequest, _sink: ResultSink) -> bool {
        false
    }
}

/// Routing engine that answers synchronously from inside `submit`.
#[derive(Debug, Clone)]
pub struct ScriptedRoutingEngine {
    reply: Result<Vec<RouteAlternative>, i32>,
}

impl ScriptedRoutingEngine {
    /// Answer every request with `routes`.
    #[must_use]
    pub const fn succeeding(routes: Vec<RouteAlternative>) -> Self {
        Self { reply: Ok(routes) }
    }

    /// Answer every request with failure `code`.
    #[must_use]
    pub const fn failing(code: i32) -> Self {
        Self { reply: Err(code) }
    }
}

impl RoutingEngine for ScriptedRoutingEngine {
    fn submit(&self, _request: RouteRequest, sink: ResultSink) -> bool {
        match &self.reply {
            Ok(routes) => sink.succeed(routes.clone()),
            Err(code) => sink.fail(*code),
        }
        true
    }
}

/// A launch observed by [`RecordingNavigationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedLaunch {
    /// Session the route came from.
    pub token: Token,
    /// Engine id of the launched alternative.
    pub route_id: i64,
    /// Requested position feed.
    pub mode: LaunchMode,
}

/// Navigation engine that records launches and optionally refuses them.
#[derive(Debug, Default)]
pub struct RecordingNavigationEngine {
    refusal: Option<String>,
    launches: Mutex<Vec<RecordedLaunch>>,
}

impl RecordingNavigationEngine {
    /// Create an engine that accepts every launch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that refuses every launch with `reason`.
    #[must_use]
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            launches: Mutex::default(),
        }
    }

    /// Launches accepted so far, oldest first.
    #[must_use]
    pub fn launches(&self) -> Vec<RecordedLaunch> {
        lock(&self.launches).clone()
    }
}

impl NavigationEngine for RecordingNavigationEngine {
    fn launch(
        &self,
        route: &RouteAlternative,
        group: &RouteGroup,
        mode: LaunchMode,
    ) -> Result<(), LaunchRefused> {
        if let Some(reason) = &self.refusal {
            return Err(LaunchRefused::new(reason.clone()));
        }
        lock(&self.launches).push(RecordedLaunch {
            token: group.token(),
            route_id: route.route_id,
            mode,
        });
        Ok(())
    }
}
