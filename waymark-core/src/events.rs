//! Best-effort notifications for passive observers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{RouteSummary, TravelMode};

/// Outcome of a calculation, broadcast to every subscriber.
///
/// Observers that lag behind the channel capacity miss events; callers
/// that need the result should await their
/// [`RouteTicket`](crate::RouteTicket) instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "kebab-case"))]
pub enum RouteEvent {
    /// A calculation succeeded and its group was stored.
    #[cfg_attr(feature = "serde", serde(rename = "route-calculated"))]
    Calculated(RouteSummary),
    /// A calculation failed.
    #[cfg_attr(feature = "serde", serde(rename = "route-failed"))]
    Failed {
        /// Mode of the failed calculation.
        mode: TravelMode,
        /// Engine error code.
        code: i32,
    },
}

impl RouteEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Calculated(_) => "route-calculated",
            Self::Failed { .. } => "route-failed",
        }
    }

    /// Travel mode the event concerns.
    #[must_use]
    pub const fn mode(&self) -> TravelMode {
        match self {
            Self::Calculated(summary) => summary.mode,
            Self::Failed { mode, .. } => *mode,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::{RouteAlternative, RouteGroup, Token};
    use rstest::rstest;

    #[rstest]
    fn failed_event_serialises_with_tag() {
        let event = RouteEvent::Failed {
            mode: TravelMode::Walk,
            code: 7,
        };
        let json = serde_json::to_value(&event).expect("event serialises");
        assert_eq!(
            json,
            serde_json::json!({ "event": "route-failed", "mode": "walk", "code": 7 })
        );
        assert_eq!(event.name(), "route-failed");
    }

    #[rstest]
    fn calculated_event_carries_summary() {
        let group = RouteGroup::new(
            Token::new(3),
            TravelMode::Drive,
            vec![RouteAlternative::new(12, 10.0, 5.0)],
        )
        .expect("valid group");
        let event = RouteEvent::Calculated(group.summary());
        let json = serde_json::to_value(&event).expect("event serialises");
        assert_eq!(json["event"], "route-calculated");
        assert_eq!(json["token"], 3);
        assert_eq!(event.mode(), TravelMode::Drive);
    }
}
