//! Route alternatives and the groups that hold them.
//!
//! A [`RouteGroup`] is the full set of alternatives returned by one
//! calculation. Exactly one alternative is flagged as the main route at
//! all times; the constructors enforce this and the fields stay private so
//! that only [`SessionStore`](crate::SessionStore) can move the flag.

use std::time::Instant;

use geo::{Coord, LineString};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Token, TravelMode};

/// One candidate path between origin and destination.
///
/// # Examples
/// ```
/// use geo::{Coord, LineString};
/// use waymark_core::RouteAlternative;
///
/// let route = RouteAlternative::new(12, 5_400.0, 720.0)
///     .with_toll(800, 2_000.0)
///     .with_polyline(LineString::new(vec![
///         Coord { x: 116.40, y: 39.90 },
///         Coord { x: 116.45, y: 39.95 },
///     ]));
/// assert_eq!(route.route_id, 12);
/// assert_eq!(route.points().count(), 2);
/// assert!(!route.is_main());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteAlternative {
    /// Identifier assigned by the routing engine.
    pub route_id: i64,
    /// Length in meters.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub duration_s: f64,
    /// Toll in currency minor units; zero where tolls do not apply.
    pub toll_cost: u64,
    /// Length of tolled road in meters.
    pub toll_distance_m: f64,
    /// Number of traffic lights along the route.
    pub traffic_lights: u32,
    /// Strategy code the engine reports having used.
    pub strategy: Option<i32>,
    /// Geometry with `x` as longitude and `y` as latitude. May be empty.
    pub polyline: LineString<f64>,
    is_main: bool,
}

impl RouteAlternative {
    /// Create an alternative with the mandatory metrics and no geometry.
    #[must_use]
    pub const fn new(route_id: i64, distance_m: f64, duration_s: f64) -> Self {
        Self {
            route_id,
            distance_m,
            duration_s,
            toll_cost: 0,
            toll_distance_m: 0.0,
            traffic_lights: 0,
            strategy: None,
            polyline: LineString(Vec::new()),
            is_main: false,
        }
    }

    /// Set the toll cost and tolled distance.
    #[must_use]
    pub const fn with_toll(mut self, toll_cost: u64, toll_distance_m: f64) -> Self {
        self.toll_cost = toll_cost;
        self.toll_distance_m = toll_distance_m;
        self
    }

    /// Set the number of traffic lights.
    #[must_use]
    pub const fn with_traffic_lights(mut self, traffic_lights: u32) -> Self {
        self.traffic_lights = traffic_lights;
        self
    }

    /// Record the strategy code the engine used.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: i32) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Attach route geometry.
    #[must_use]
    pub fn with_polyline(mut self, polyline: LineString<f64>) -> Self {
        self.polyline = polyline;
        self
    }

    /// Set the main flag. Only meaningful as input to
    /// [`RouteGroup::from_parts`]; [`RouteGroup::new`] overrides it.
    #[must_use]
    pub const fn marked_main(mut self, is_main: bool) -> Self {
        self.is_main = is_main;
        self
    }

    /// Whether this alternative is the group's main route.
    #[must_use]
    pub const fn is_main(&self) -> bool {
        self.is_main
    }

    /// Iterate over the geometry as `(latitude, longitude)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.polyline.coords().map(|c: &Coord<f64>| (c.y, c.x))
    }

    fn validate(&self, index: usize) -> Result<(), GroupError> {
        let metrics = [
            ("distance", self.distance_m),
            ("duration", self.duration_s),
            ("toll distance", self.toll_distance_m),
        ];
        for (field, value) in metrics {
            if !value.is_finite() || value < 0.0 {
                return Err(GroupError::InvalidMetric { index, field });
            }
        }
        if self
            .polyline
            .coords()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(GroupError::InvalidMetric {
                index,
                field: "polyline",
            });
        }
        Ok(())
    }
}

/// Errors returned by the [`RouteGroup`] constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    /// No alternatives were supplied.
    #[error("a route group must contain at least one alternative")]
    Empty,
    /// The supplied flags did not mark exactly one main alternative.
    #[error("exactly one alternative must be main, found {found}")]
    MainCount {
        /// Number of alternatives flagged as main.
        found: usize,
    },
    /// A metric was negative or not finite.
    #[error("alternative {index} has an invalid {field}")]
    InvalidMetric {
        /// Position of the offending alternative.
        index: usize,
        /// Name of the offending metric.
        field: &'static str,
    },
}

/// The alternatives produced by one calculation, addressable by a token.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGroup {
    token: Token,
    mode: TravelMode,
    alternatives: Vec<RouteAlternative>,
    main: usize,
    created_at: Instant,
}

impl RouteGroup {
    /// Build a group whose first alternative is main.
    ///
    /// Alternatives keep the order the engine returned them in.
    ///
    /// # Errors
    /// Returns [`GroupError::Empty`] for an empty list and
    /// [`GroupError::InvalidMetric`] for negative or non-finite metrics.
    ///
    /// # Examples
    /// ```
    /// use waymark_core::{RouteAlternative, RouteGroup, Token, TravelMode};
    ///
    /// # fn main() -> Result<(), waymark_core::GroupError> {
    /// let group = RouteGroup::new(
    ///     Token::FIRST,
    ///     TravelMode::Drive,
    ///     vec![
    ///         RouteAlternative::new(12, 1_000.0, 60.0),
    ///         RouteAlternative::new(13, 1_200.0, 55.0),
    ///     ],
    /// )?;
    /// assert_eq!(group.main_index(), 0);
    /// assert_eq!(group.route_ids(), vec![12, 13]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        token: Token,
        mode: TravelMode,
        alternatives: Vec<RouteAlternative>,
    ) -> Result<Self, GroupError> {
        check_alternatives(&alternatives)?;
        Ok(Self::from_checked(token, mode, alternatives))
    }

    /// Build a group from alternatives already accepted by
    /// [`check_alternatives`], making the first one main.
    pub(crate) fn from_checked(
        token: Token,
        mode: TravelMode,
        alternatives: Vec<RouteAlternative>,
    ) -> Self {
        let flagged = alternatives
            .into_iter()
            .enumerate()
            .map(|(index, alternative)| alternative.marked_main(index == 0))
            .collect();
        Self {
            token,
            mode,
            alternatives: flagged,
            main: 0,
            created_at: Instant::now(),
        }
    }

    /// Build a group keeping the caller's main flags.
    ///
    /// # Errors
    /// Returns [`GroupError::MainCount`] unless exactly one alternative is
    /// flagged, plus the errors of [`RouteGroup::new`].
    pub fn from_parts(
        token: Token,
        mode: TravelMode,
        alternatives: Vec<RouteAlternative>,
    ) -> Result<Self, GroupError> {
        check_alternatives(&alternatives)?;
        let found = alternatives.iter().filter(|a| a.is_main).count();
        let flagged = alternatives.iter().position(RouteAlternative::is_main);
        let Some(main) = flagged.filter(|_| found == 1) else {
            return Err(GroupError::MainCount { found });
        };
        Ok(Self {
            token,
            mode,
            alternatives,
            main,
            created_at: Instant::now(),
        })
    }

    /// Token the group is stored under.
    #[must_use]
    pub const fn token(&self) -> Token {
        self.token
    }

    /// Travel mode the group was calculated for.
    #[must_use]
    pub const fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Alternatives in engine order.
    #[must_use]
    pub fn alternatives(&self) -> &[RouteAlternative] {
        &self.alternatives
    }

    /// When the group was built.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Number of alternatives; never zero.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alternatives.len()
    }

    /// Always `false`; groups cannot be empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Position of the main alternative.
    #[must_use]
    pub const fn main_index(&self) -> usize {
        self.main
    }

    /// The main alternative.
    ///
    /// # Panics
    /// Never in practice: the constructors and main-route selection
    /// keep the main index inside the non-empty alternative list.
    #[must_use]
    pub fn main(&self) -> &RouteAlternative {
        self.alternatives
            .get(self.main)
            .unwrap_or_else(|| panic!("route group main index {} out of bounds", self.main))
    }

    /// Engine identifiers of every alternative, in order.
    #[must_use]
    pub fn route_ids(&self) -> Vec<i64> {
        self.alternatives.iter().map(|a| a.route_id).collect()
    }

    /// Position of the alternative carrying `route_id`, if any.
    #[must_use]
    pub fn position_of(&self, route_id: i64) -> Option<usize> {
        self.alternatives.iter().position(|a| a.route_id == route_id)
    }

    /// Move the main flag to `index`. Returns `false` when out of bounds,
    /// leaving the flags untouched.
    pub(crate) fn set_main(&mut self, index: usize) -> bool {
        if index >= self.alternatives.len() {
            return false;
        }
        for (position, alternative) in self.alternatives.iter_mut().enumerate() {
            alternative.is_main = position == index;
        }
        self.main = index;
        true
    }

    /// Snapshot the group as a caller-facing summary.
    #[must_use]
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            token: self.token,
            mode: self.mode,
            main_index: self.main_index(),
            route_ids: self.route_ids(),
            alternatives: self.alternatives.clone(),
        }
    }
}

/// Reject empty lists and alternatives with unusable metrics.
pub(crate) fn check_alternatives(alternatives: &[RouteAlternative]) -> Result<(), GroupError> {
    if alternatives.is_empty() {
        return Err(GroupError::Empty);
    }
    for (index, alternative) in alternatives.iter().enumerate() {
        alternative.validate(index)?;
    }
    Ok(())
}

/// What a calculation resolves to and what `route-calculated` carries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteSummary {
    /// Token addressing the stored group.
    pub token: Token,
    /// Travel mode of the calculation.
    pub mode: TravelMode,
    /// Position of the main alternative.
    pub main_index: usize,
    /// Engine identifiers, in order.
    pub route_ids: Vec<i64>,
    /// The alternatives themselves.
    pub alternatives: Vec<RouteAlternative>,
}

impl RouteSummary {
    /// Number of alternatives.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.alternatives.len()
    }
}
