//! Opaque session handles.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle identifying one stored route group.
///
/// Tokens are issued by [`SessionStore`](crate::SessionStore) from a
/// monotonic counter starting at 1 and are never reused while the store
/// lives, even after the session they named has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Token(u64);

impl Token {
    /// The first token a fresh store issues.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw value received from a caller.
    ///
    /// No validation happens here; unknown values surface as
    /// [`SessionError::UnknownToken`](crate::SessionError::UnknownToken)
    /// when used.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw value handed to callers.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for Token {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
