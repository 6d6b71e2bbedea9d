//! Calculation requests and their validation.
//!
//! A [`CalculateRoute`] is what callers send. [`CalculateRoute::validate`]
//! checks it and resolves defaults, producing the [`RouteRequest`] that is
//! handed to the routing engine. Invalid requests never reach the engine.
//!
//! Coordinates follow the `geo` convention: `x` is longitude and `y` is
//! latitude.

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TravelMode;

/// Single or multiple route policy for walk, ride and e-bike modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TravelPolicy {
    /// Ask for a single recommended route.
    #[default]
    Single,
    /// Ask for several alternatives.
    Multiple,
}

impl TravelPolicy {
    /// Engine code for the policy.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Single => 1000,
            Self::Multiple => 1001,
        }
    }
}

/// Preference flags the engine folds into a drive strategy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps to an independent engine preference"
)]
pub struct StrategyFlags {
    /// Prefer routes around congestion.
    pub avoid_congestion: bool,
    /// Keep off highways.
    pub avoid_highway: bool,
    /// Keep off toll roads.
    pub avoid_cost: bool,
    /// Prefer highways.
    pub prioritise_highway: bool,
}

/// How the engine should choose among candidate routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RouteStrategy {
    /// Explicit engine strategy code, passed through untouched.
    Code(i32),
    /// Preference flags for motorised modes.
    Flags(StrategyFlags),
    /// Route count policy for non-motorised modes.
    Travel(TravelPolicy),
}

impl RouteStrategy {
    /// Strategy used when a request names none.
    ///
    /// # Examples
    /// ```
    /// use waymark_core::{RouteStrategy, TravelMode, TravelPolicy};
    ///
    /// assert_eq!(RouteStrategy::default_for(TravelMode::Drive), RouteStrategy::Code(0));
    /// assert_eq!(
    ///     RouteStrategy::default_for(TravelMode::Walk),
    ///     RouteStrategy::Travel(TravelPolicy::Single),
    /// );
    /// ```
    #[must_use]
    pub const fn default_for(mode: TravelMode) -> Self {
        if mode.is_motorised() {
            Self::Code(0)
        } else {
            Self::Travel(TravelPolicy::Single)
        }
    }

    /// The engine code, when one is known without engine help.
    ///
    /// Flags return `None`; converting them is the engine's business.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(code),
            Self::Travel(policy) => Some(policy.code()),
            Self::Flags(_) => None,
        }
    }

    const fn applies_to(self, mode: TravelMode) -> bool {
        match self {
            Self::Code(_) => true,
            Self::Flags(_) => mode.is_motorised(),
            Self::Travel(_) => !mode.is_motorised(),
        }
    }
}

/// Truck dimensions used for restriction-aware routing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TruckProfile {
    /// Height in meters.
    pub height_m: f64,
    /// Width in meters.
    pub width_m: f64,
    /// Length in meters.
    pub length_m: f64,
    /// Gross weight in tonnes.
    pub weight_t: f64,
    /// Number of axles.
    pub axles: u8,
}

impl TruckProfile {
    fn validate(&self) -> Result<(), RequestError> {
        let dimensions = [
            ("height", self.height_m),
            ("width", self.width_m),
            ("length", self.length_m),
            ("weight", self.weight_t),
        ];
        for (name, value) in dimensions {
            if !value.is_finite() || value <= 0.0 {
                return Err(RequestError::InvalidVehicle {
                    reason: format!("truck {name} must be finite and positive"),
                });
            }
        }
        if self.axles == 0 {
            return Err(RequestError::InvalidVehicle {
                reason: "truck must have at least one axle".to_owned(),
            });
        }
        Ok(())
    }
}

/// Vehicle details the engine uses for plate restrictions and access rules.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleInfo {
    /// Licence plate.
    pub plate: Option<String>,
    /// Whether plate-based driving restrictions should be honoured.
    pub restriction: bool,
    /// Engine displacement; motorcycle mode only.
    pub motorcycle_cc: Option<u32>,
    /// Dimensions; truck mode only.
    pub truck: Option<TruckProfile>,
}

impl VehicleInfo {
    fn validate(&self, mode: TravelMode) -> Result<(), RequestError> {
        let invalid = |reason: &str| RequestError::InvalidVehicle {
            reason: reason.to_owned(),
        };
        if !mode.is_motorised() {
            return Err(invalid("vehicle details only apply to motorised modes"));
        }
        if self.plate.as_deref().is_some_and(|plate| plate.trim().is_empty()) {
            return Err(invalid("plate must not be blank"));
        }
        if let Some(cc) = self.motorcycle_cc {
            if mode != TravelMode::Motorcycle {
                return Err(invalid("engine displacement only applies to motorcycles"));
            }
            if cc == 0 {
                return Err(invalid("engine displacement must be positive"));
            }
        }
        if let Some(truck) = &self.truck {
            if mode != TravelMode::Truck {
                return Err(invalid("truck dimensions only apply to trucks"));
            }
            truck.validate()?;
        }
        Ok(())
    }
}

/// Reasons a request is refused before reaching the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No destination was given.
    #[error("destination is required")]
    MissingDestination,
    /// A coordinate was out of range or not finite.
    #[error("{field} is not a valid coordinate")]
    InvalidCoordinate {
        /// Which coordinate failed, e.g. `origin` or `waypoints[2]`.
        field: String,
    },
    /// More waypoints than the engine supports.
    #[error("{count} waypoints exceed the limit of {max}")]
    TooManyWaypoints {
        /// Waypoints supplied.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },
    /// The strategy kind does not fit the travel mode.
    #[error("strategy does not apply to {mode} routes")]
    StrategyNotApplicable {
        /// Mode of the request.
        mode: TravelMode,
    },
    /// Vehicle details were inconsistent with the mode or out of range.
    #[error("invalid vehicle details: {reason}")]
    InvalidVehicle {
        /// What was wrong.
        reason: String,
    },
}

/// A calculation request as callers send it.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use waymark_core::{CalculateRoute, RouteStrategy, TravelMode, TravelPolicy};
///
/// let request = CalculateRoute::new(TravelMode::Walk)
///     .with_origin(Coord { x: 116.40, y: 39.90 })
///     .with_destination(Coord { x: 116.45, y: 39.95 });
/// let parsed = request.validate(16).expect("valid request");
/// assert_eq!(parsed.strategy, RouteStrategy::Travel(TravelPolicy::Single));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalculateRoute {
    /// Travel mode to calculate for.
    pub mode: TravelMode,
    /// Start point; `None` lets the engine use the current position.
    pub origin: Option<Coord<f64>>,
    /// End point; required.
    pub destination: Option<Coord<f64>>,
    /// Intermediate stops, in order.
    pub waypoints: Vec<Coord<f64>>,
    /// Strategy; `None` selects [`RouteStrategy::default_for`].
    pub strategy: Option<RouteStrategy>,
    /// Vehicle details for motorised modes.
    pub vehicle: Option<VehicleInfo>,
}

impl CalculateRoute {
    /// Start an empty request for `mode`.
    #[must_use]
    pub const fn new(mode: TravelMode) -> Self {
        Self {
            mode,
            origin: None,
            destination: None,
            waypoints: Vec::new(),
            strategy: None,
            vehicle: None,
        }
    }

    /// Set the start point.
    #[must_use]
    pub const fn with_origin(mut self, origin: Coord<f64>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set the end point.
    #[must_use]
    pub const fn with_destination(mut self, destination: Coord<f64>) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Append an intermediate stop.
    #[must_use]
    pub fn with_waypoint(mut self, waypoint: Coord<f64>) -> Self {
        self.waypoints.push(waypoint);
        self
    }

    /// Choose a strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: RouteStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Attach vehicle details.
    #[must_use]
    pub fn with_vehicle(mut self, vehicle: VehicleInfo) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    /// Check the request and resolve defaults.
    ///
    /// # Errors
    /// Returns the first [`RequestError`] found.
    pub fn validate(&self, max_waypoints: usize) -> Result<RouteRequest, RequestError> {
        let destination = self.destination.ok_or(RequestError::MissingDestination)?;
        check_coordinate("destination", destination)?;
        if let Some(origin) = self.origin {
            check_coordinate("origin", origin)?;
        }
        if self.waypoints.len() > max_waypoints {
            return Err(RequestError::TooManyWaypoints {
                count: self.waypoints.len(),
                max: max_waypoints,
            });
        }
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            check_coordinate(&format!("waypoints[{index}]"), *waypoint)?;
        }
        let strategy = self
            .strategy
            .unwrap_or_else(|| RouteStrategy::default_for(self.mode));
        if !strategy.applies_to(self.mode) {
            return Err(RequestError::StrategyNotApplicable { mode: self.mode });
        }
        if let Some(vehicle) = &self.vehicle {
            vehicle.validate(self.mode)?;
        }
        Ok(RouteRequest {
            mode: self.mode,
            origin: self.origin,
            destination,
            waypoints: self.waypoints.clone(),
            strategy,
            vehicle: self.vehicle.clone(),
        })
    }
}

fn check_coordinate(field: &str, coord: Coord<f64>) -> Result<(), RequestError> {
    let latitude_ok = coord.y.is_finite() && (-90.0..=90.0).contains(&coord.y);
    let longitude_ok = coord.x.is_finite() && (-180.0..=180.0).contains(&coord.x);
    if latitude_ok && longitude_ok {
        Ok(())
    } else {
        Err(RequestError::InvalidCoordinate {
            field: field.to_owned(),
        })
    }
}

/// A validated request, as submitted to a [`RoutingEngine`](crate::RoutingEngine).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteRequest {
    /// Travel mode to calculate for.
    pub mode: TravelMode,
    /// Start point; `None` means the current position.
    pub origin: Option<Coord<f64>>,
    /// End point.
    pub destination: Coord<f64>,
    /// Intermediate stops, in order.
    pub waypoints: Vec<Coord<f64>>,
    /// Resolved strategy.
    pub strategy: RouteStrategy,
    /// Vehicle details, already checked against the mode.
    pub vehicle: Option<VehicleInfo>,
}
