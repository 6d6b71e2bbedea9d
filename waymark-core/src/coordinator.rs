//! Correlating asynchronous engine results with the callers that asked.
//!
//! Each travel mode owns one pending slot. [`CalculationCoordinator::request_route`]
//! claims the slot, hands the validated request to the engine and returns a
//! [`RouteTicket`]. Whichever callback arrives first takes the slot, so a
//! caller is resolved at most once and never with another caller's result.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Instant;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use crate::route::check_alternatives;
use crate::{
    CalculateRoute, PlannerConfig, RequestError, RouteAlternative, RouteEvent, RouteGroup,
    RouteSummary, RoutingEngine, SessionStore, TravelMode,
};

/// Failure code used when the engine reports success without usable routes.
pub const EMPTY_RESULT_CODE: i32 = -1;

/// Errors surfaced by [`CalculationCoordinator::request_route`] and
/// [`RouteTicket`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    /// A calculation for this mode is already in flight.
    #[error("a {0} calculation is already pending")]
    Busy(TravelMode),
    /// The request failed validation and was never submitted.
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    /// The engine refused the submission.
    #[error("the routing engine refused the {0} request")]
    EngineRejected(TravelMode),
    /// The engine reported a failure.
    #[error("{mode} calculation failed with engine code {code}")]
    CalculationFailed {
        /// Mode of the failed calculation.
        mode: TravelMode,
        /// Engine error code.
        code: i32,
    },
    /// The pending request was cancelled before a result arrived.
    #[error("the {0} calculation was cancelled")]
    Cancelled(TravelMode),
}

type Outcome = Result<RouteSummary, CalculationError>;

#[derive(Debug)]
struct PendingRequest {
    id: u64,
    responder: oneshot::Sender<Outcome>,
    issued_at: Instant,
}

#[derive(Debug)]
struct Shared {
    store: Arc<SessionStore>,
    pending: Mutex<HashMap<TravelMode, PendingRequest>>,
    events: broadcast::Sender<RouteEvent>,
}

impl Shared {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<TravelMode, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, mode: TravelMode, request_id: Option<u64>) -> Option<PendingRequest> {
        take_slot(&mut self.lock_pending(), mode, request_id)
    }

    fn publish(&self, event: RouteEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            debug!("no subscribers for {name}");
        }
    }

    fn complete_success(
        &self,
        mode: TravelMode,
        request_id: Option<u64>,
        routes: Vec<RouteAlternative>,
    ) {
        // The pending lock is held until the group is stored so a concurrent
        // reset either sees the slot or sees the stored group.
        let mut pending = self.lock_pending();
        let Some(slot) = take_slot(&mut pending, mode, request_id) else {
            warn!("dropping stray {mode} success callback");
            return;
        };
        if let Err(err) = check_alternatives(&routes) {
            drop(pending);
            warn!("{mode} engine result unusable: {err}");
            self.resolve_failure(mode, slot, EMPTY_RESULT_CODE);
            return;
        }
        let token = self.store.allocate_token();
        let group = RouteGroup::from_checked(token, mode, routes);
        let summary = group.summary();
        self.store.store(group);
        drop(pending);
        debug!(
            "{mode} calculation resolved as {token} after {:?}",
            slot.issued_at.elapsed()
        );
        if slot.responder.send(Ok(summary.clone())).is_err() {
            debug!("caller for {mode} stopped waiting; {token} stays stored");
        }
        self.publish(RouteEvent::Calculated(summary));
    }

    fn complete_failure(&self, mode: TravelMode, request_id: Option<u64>, code: i32) {
        let Some(slot) = self.take(mode, request_id) else {
            warn!("dropping stray {mode} failure callback (code {code})");
            return;
        };
        self.resolve_failure(mode, slot, code);
    }

    fn resolve_failure(&self, mode: TravelMode, slot: PendingRequest, code: i32) {
        debug!("{mode} calculation failed with code {code}");
        if slot
            .responder
            .send(Err(CalculationError::CalculationFailed { mode, code }))
            .is_err()
        {
            debug!("caller for {mode} stopped waiting");
        }
        self.publish(RouteEvent::Failed { mode, code });
    }
}

/// Take the slot for `mode`, optionally only if it belongs to `request_id`.
fn take_slot(
    pending: &mut HashMap<TravelMode, PendingRequest>,
    mode: TravelMode,
    request_id: Option<u64>,
) -> Option<PendingRequest> {
    match pending.get(&mode) {
        Some(slot) if request_id.is_none_or(|id| id == slot.id) => pending.remove(&mode),
        _ => None,
    }
}

/// Callback handle given to the engine with each submission.
///
/// The sink is bound to one request. Reporting through it after that
/// request was resolved or cancelled, or after the coordinator was dropped,
/// is logged and ignored; it can never complete a later request for the
/// same mode.
#[derive(Debug, Clone)]
pub struct ResultSink {
    shared: Weak<Shared>,
    mode: TravelMode,
    request_id: u64,
}

impl ResultSink {
    /// Mode of the request this sink answers.
    #[must_use]
    pub const fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Report the alternatives in engine order; the first becomes main.
    ///
    /// An empty list or one with invalid metrics resolves the caller with
    /// [`CalculationError::CalculationFailed`] carrying
    /// [`EMPTY_RESULT_CODE`].
    pub fn succeed(&self, routes: Vec<RouteAlternative>) {
        let Some(shared) = self.shared.upgrade() else {
            warn!("dropping {} success callback after shutdown", self.mode);
            return;
        };
        shared.complete_success(self.mode, Some(self.request_id), routes);
    }

    /// Report an engine failure code.
    pub fn fail(&self, code: i32) {
        let Some(shared) = self.shared.upgrade() else {
            warn!("dropping {} failure callback after shutdown", self.mode);
            return;
        };
        shared.complete_failure(self.mode, Some(self.request_id), code);
    }
}

/// Pending result of one calculation.
///
/// Await it from async code or call [`wait_blocking`](Self::wait_blocking)
/// from a plain thread. Dropping the ticket does not cancel the calculation.
#[derive(Debug)]
pub struct RouteTicket {
    mode: TravelMode,
    receiver: oneshot::Receiver<Outcome>,
}

impl RouteTicket {
    /// Mode of the calculation.
    #[must_use]
    pub const fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Return the outcome if it has arrived, without waiting.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(CalculationError::Cancelled(self.mode)))
            }
        }
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// # Errors
    /// Returns the [`CalculationError`] the calculation resolved with.
    ///
    /// # Panics
    /// Panics if called from within an asynchronous execution context.
    pub fn wait_blocking(self) -> Outcome {
        let mode = self.mode;
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(CalculationError::Cancelled(mode)))
    }
}

impl Future for RouteTicket {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mode = this.mode;
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CalculationError::Cancelled(mode))))
    }
}

/// Single-flight, per-mode correlation of engine callbacks.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use geo::Coord;
/// use waymark_core::{
///     CalculateRoute, CalculationCoordinator, PlannerConfig, ResultSink, RouteAlternative,
///     RouteRequest, RoutingEngine, SessionStore, TravelMode,
/// };
///
/// struct Immediate;
///
/// impl RoutingEngine for Immediate {
///     fn submit(&self, _request: RouteRequest, sink: ResultSink) -> bool {
///         sink.succeed(vec![
///             RouteAlternative::new(12, 1_000.0, 60.0),
///             RouteAlternative::new(13, 1_100.0, 55.0),
///         ]);
///         true
///     }
/// }
///
/// let store = Arc::new(SessionStore::new());
/// let coordinator = CalculationCoordinator::new(
///     Arc::clone(&store),
///     Arc::new(Immediate),
///     &PlannerConfig::default(),
/// );
/// let request =
///     CalculateRoute::new(TravelMode::Drive).with_destination(Coord { x: 116.45, y: 39.95 });
/// let summary = coordinator
///     .request_route(&request)
///     .and_then(|ticket| ticket.wait_blocking())
///     .expect("calculated");
/// assert_eq!(summary.route_ids, vec![12, 13]);
/// assert_eq!(store.len(), 1);
/// ```
pub struct CalculationCoordinator {
    shared: Arc<Shared>,
    engine: Arc<dyn RoutingEngine>,
    next_request: AtomicU64,
    max_waypoints: usize,
}

impl std::fmt::Debug for CalculationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculationCoordinator")
            .field("pending", &self.pending_modes())
            .field("max_waypoints", &self.max_waypoints)
            .finish_non_exhaustive()
    }
}

impl CalculationCoordinator {
    /// Create a coordinator storing successful groups in `store`.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        engine: Arc<dyn RoutingEngine>,
        config: &PlannerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                store,
                pending: Mutex::new(HashMap::new()),
                events,
            }),
            engine,
            next_request: AtomicU64::new(1),
            max_waypoints: config.max_waypoints,
        }
    }

    /// Validate `request` and submit it to the engine.
    ///
    /// Never blocks on the engine's result; await the returned ticket.
    ///
    /// # Errors
    /// - [`CalculationError::InvalidRequest`] if validation fails.
    /// - [`CalculationError::Busy`] if the mode already has a pending
    ///   calculation; that calculation is unaffected.
    /// - [`CalculationError::EngineRejected`] if the engine refuses the
    ///   submission; the slot is freed again.
    pub fn request_route(&self, request: &CalculateRoute) -> Result<RouteTicket, CalculationError> {
        let parsed = request.validate(self.max_waypoints)?;
        let mode = parsed.mode;
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (responder, receiver) = oneshot::channel();
        {
            let mut pending = self.shared.lock_pending();
            if pending.contains_key(&mode) {
                debug!("refusing {mode} request: calculation already pending");
                return Err(CalculationError::Busy(mode));
            }
            pending.insert(
                mode,
                PendingRequest {
                    id: request_id,
                    responder,
                    issued_at: Instant::now(),
                },
            );
        }
        debug!("submitting {mode} request {request_id}");
        let sink = ResultSink {
            shared: Arc::downgrade(&self.shared),
            mode,
            request_id,
        };
        if !self.engine.submit(parsed, sink) {
            warn!("routing engine refused {mode} request {request_id}");
            self.shared.take(mode, Some(request_id));
            return Err(CalculationError::EngineRejected(mode));
        }
        Ok(RouteTicket { mode, receiver })
    }

    /// Deliver a success for whatever request is pending on `mode`.
    ///
    /// For engines that report through one process-wide listener rather
    /// than per-request sinks. Dropped with a warning when nothing is
    /// pending.
    pub fn on_success(&self, mode: TravelMode, routes: Vec<RouteAlternative>) {
        self.shared.complete_success(mode, None, routes);
    }

    /// Deliver a failure for whatever request is pending on `mode`.
    pub fn on_failure(&self, mode: TravelMode, code: i32) {
        self.shared.complete_failure(mode, None, code);
    }

    /// Forget the pending request for `mode` without waiting for the engine.
    ///
    /// The caller's ticket resolves with [`CalculationError::Cancelled`]; a
    /// late engine callback is dropped. Returns whether anything was pending.
    pub fn cancel_pending(&self, mode: TravelMode) -> bool {
        let Some(slot) = self.shared.take(mode, None) else {
            return false;
        };
        cancel(mode, slot);
        true
    }

    /// Cancel every pending request, returning how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(TravelMode, PendingRequest)> =
            self.shared.lock_pending().drain().collect();
        cancel_each(drained)
    }

    /// Cancel every pending request and empty the store as one step.
    ///
    /// A success callback racing with the reset either stores its group
    /// before the store is cleared or finds its slot already gone, so no
    /// group from before the reset survives it. Returns how many requests
    /// were cancelled.
    pub fn cancel_all_and_clear(&self) -> usize {
        let drained: Vec<(TravelMode, PendingRequest)> = {
            let mut pending = self.shared.lock_pending();
            let slots = pending.drain().collect();
            self.shared.store.clear_all();
            slots
        };
        cancel_each(drained)
    }

    /// Whether a calculation is in flight for `mode`.
    #[must_use]
    pub fn is_pending(&self, mode: TravelMode) -> bool {
        self.shared.lock_pending().contains_key(&mode)
    }

    /// Modes with a calculation in flight, in declaration order.
    #[must_use]
    pub fn pending_modes(&self) -> Vec<TravelMode> {
        let mut modes: Vec<TravelMode> = self.shared.lock_pending().keys().copied().collect();
        modes.sort_unstable();
        modes
    }

    /// Subscribe to `route-calculated` and `route-failed` events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RouteEvent> {
        self.shared.events.subscribe()
    }
}

fn cancel_each(drained: Vec<(TravelMode, PendingRequest)>) -> usize {
    let count = drained.len();
    for (mode, slot) in drained {
        cancel(mode, slot);
    }
    count
}

fn cancel(mode: TravelMode, slot: PendingRequest) {
    debug!("cancelled pending {mode} request {}", slot.id);
    if slot
        .responder
        .send(Err(CalculationError::Cancelled(mode)))
        .is_err()
    {
        debug!("caller for {mode} stopped waiting");
    }
}
