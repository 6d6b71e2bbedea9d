//! Choosing the main alternative of a group.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which alternative should become main.
///
/// Callers name an alternative either by the engine's route id or by its
/// position in the group. Omitting both keeps the current main route.
///
/// # Examples
/// ```
/// use waymark_core::Selection;
///
/// assert_eq!(Selection::from_options(Some(13), Some(0)), Selection::ById(13));
/// assert_eq!(Selection::from_options(None, Some(2)), Selection::ByIndex(2));
/// assert_eq!(Selection::from_options(None, None), Selection::Keep);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Selection {
    /// Leave the main route unchanged.
    #[default]
    Keep,
    /// Select the alternative carrying this engine route id.
    ById(i64),
    /// Select the alternative at this position.
    ByIndex(usize),
}

impl Selection {
    /// Build a selection from the optional pair callers send.
    ///
    /// The route id wins when both are present.
    #[must_use]
    pub const fn from_options(route_id: Option<i64>, route_index: Option<usize>) -> Self {
        match (route_id, route_index) {
            (Some(id), _) => Self::ById(id),
            (None, Some(index)) => Self::ByIndex(index),
            (None, None) => Self::Keep,
        }
    }

    /// Whether applying the selection can change anything.
    #[must_use]
    pub const fn is_keep(self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => f.write_str("current main route"),
            Self::ById(id) => write!(f, "route id {id}"),
            Self::ByIndex(index) => write!(f, "route index {index}"),
        }
    }
}
