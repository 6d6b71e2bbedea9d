//! Travel and launch modes.
//!
//! Each travel mode owns one single-flight calculation slot, so the enum
//! doubles as the key of the coordinator's pending map.
//!
//! # Examples
//! ```
//! use waymark_core::TravelMode;
//!
//! assert_eq!(TravelMode::EBike.as_str(), "e-bike");
//! assert_eq!("truck".parse::<TravelMode>(), Ok(TravelMode::Truck));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mode of transport a calculation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TravelMode {
    /// Passenger car.
    Drive,
    /// Goods vehicle; honours the truck profile of a request.
    Truck,
    /// Pedestrian.
    Walk,
    /// Bicycle.
    Ride,
    /// Electric bicycle.
    EBike,
    /// Motorcycle; honours the engine displacement of a request.
    Motorcycle,
}

impl TravelMode {
    /// Every travel mode, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Drive,
        Self::Truck,
        Self::Walk,
        Self::Ride,
        Self::EBike,
        Self::Motorcycle,
    ];

    /// Return the mode as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Truck => "truck",
            Self::Walk => "walk",
            Self::Ride => "ride",
            Self::EBike => "e-bike",
            Self::Motorcycle => "motorcycle",
        }
    }

    /// Whether the mode runs on roads with motor traffic.
    ///
    /// Motorised modes accept drive strategies and report toll costs;
    /// the others use the single/multiple travel policy.
    #[must_use]
    pub const fn is_motorised(self) -> bool {
        matches!(self, Self::Drive | Self::Truck | Self::Motorcycle)
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" | "car" => Ok(Self::Drive),
            "truck" => Ok(Self::Truck),
            "walk" => Ok(Self::Walk),
            "ride" | "bike" => Ok(Self::Ride),
            "e-bike" | "ebike" => Ok(Self::EBike),
            "motorcycle" => Ok(Self::Motorcycle),
            _ => Err(format!("unknown travel mode '{s}'")),
        }
    }
}

/// Position feed used once navigation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LaunchMode {
    /// Live GPS positioning.
    #[default]
    Gps,
    /// Emulated movement along the route.
    Simulated,
}

impl LaunchMode {
    /// Return the mode as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LaunchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gps" | "0" => Ok(Self::Gps),
            "simulated" | "emulator" | "1" => Ok(Self::Simulated),
            _ => Err(format!("unknown launch mode '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    fn display_matches_as_str() {
        for mode in TravelMode::ALL {
            assert_eq!(mode.to_string(), mode.as_str());
            assert_eq!(TravelMode::from_str(mode.as_str()), Ok(mode));
        }
    }

    #[rstest]
    #[case(TravelMode::Drive, true)]
    #[case(TravelMode::Truck, true)]
    #[case(TravelMode::Motorcycle, true)]
    #[case(TravelMode::Walk, false)]
    #[case(TravelMode::Ride, false)]
    #[case(TravelMode::EBike, false)]
    fn motorised_modes(#[case] mode: TravelMode, #[case] expected: bool) {
        assert_eq!(mode.is_motorised(), expected);
    }

    #[rstest]
    #[case("gps", LaunchMode::Gps)]
    #[case("0", LaunchMode::Gps)]
    #[case("emulator", LaunchMode::Simulated)]
    #[case("Simulated", LaunchMode::Simulated)]
    fn launch_mode_parses_aliases(#[case] input: &str, #[case] expected: LaunchMode) {
        assert_eq!(LaunchMode::from_str(input), Ok(expected));
    }

    #[test]
    fn parsing_rejects_unknown() {
        let err = TravelMode::from_str("hovercraft").expect_err("unknown name rejected");
        assert!(err.contains("unknown travel mode"));
    }
}
