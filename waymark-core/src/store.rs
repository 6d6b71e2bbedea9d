//! Token-addressed registry of route groups.
//!
//! [`SessionStore`] is the sole authority on which sessions exist. It
//! issues tokens, holds every stored [`RouteGroup`] and is the only place
//! the main flag of a stored group can change. All state sits behind one
//! mutex, so operations on the same token are linearizable and a caller
//! never sees a half-updated group or one that was released mid-update.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::{RouteGroup, Selection, Token};

/// Errors returned by [`SessionStore`] lookups and selections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The token was never issued or has been released.
    #[error("unknown route token {0}")]
    UnknownToken(Token),
    /// The selector matched no alternative of the group.
    #[error("{selection} does not match any alternative of session {token}")]
    InvalidSelection {
        /// Session the selection targeted.
        token: Token,
        /// The selector that failed to match.
        selection: Selection,
    },
}

#[derive(Debug)]
struct Session {
    group: RouteGroup,
    touched_at: Instant,
}

#[derive(Debug)]
struct StoreState {
    next_token: Token,
    sessions: HashMap<Token, Session>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_token: Token::FIRST,
            sessions: HashMap::new(),
        }
    }
}

/// Concurrency-safe map from [`Token`] to [`RouteGroup`].
///
/// # Examples
/// ```
/// use waymark_core::{RouteAlternative, RouteGroup, Selection, SessionStore, TravelMode};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SessionStore::new();
/// let token = store.allocate_token();
/// let group = RouteGroup::new(
///     token,
///     TravelMode::Drive,
///     vec![
///         RouteAlternative::new(12, 1_000.0, 60.0),
///         RouteAlternative::new(13, 900.0, 70.0),
///     ],
/// )?;
/// store.store(group);
/// store.select_main(token, Selection::ById(13))?;
/// assert_eq!(store.get(token)?.main().route_id, 13);
/// assert!(store.release(token));
/// assert!(!store.release(token));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Create an empty store whose first token is [`Token::FIRST`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the state consistent, so a panic in
    // another holder cannot have left a torn map behind.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a token that has never been returned before.
    pub fn allocate_token(&self) -> Token {
        let mut state = self.lock();
        let token = state.next_token;
        state.next_token = token.next();
        token
    }

    /// Insert or replace the session for `group.token()`.
    ///
    /// Groups can only be built through validating constructors, so the
    /// non-empty and single-main preconditions hold on entry.
    pub fn store(&self, group: RouteGroup) {
        debug_assert!(!group.is_empty(), "stored route groups must not be empty");
        let token = group.token();
        let alternatives = group.len();
        let replaced = self
            .lock()
            .sessions
            .insert(
                token,
                Session {
                    group,
                    touched_at: Instant::now(),
                },
            )
            .is_some();
        debug!("stored route group {token} ({alternatives} alternatives, replaced: {replaced})");
    }

    /// Return a snapshot of the group stored under `token`.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownToken`] if no such session exists.
    pub fn get(&self, token: Token) -> Result<RouteGroup, SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(&token)
            .ok_or(SessionError::UnknownToken(token))?;
        session.touched_at = Instant::now();
        Ok(session.group.clone())
    }

    /// Make the alternative named by `selection` the main route.
    ///
    /// [`Selection::Keep`] only checks that the session exists.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownToken`] for a missing session and
    /// [`SessionError::InvalidSelection`] when nothing matches; the group is
    /// left unchanged in both cases.
    pub fn select_main(&self, token: Token, selection: Selection) -> Result<(), SessionError> {
        let mut state = self.lock();
        apply_selection(&mut state, token, selection).map(|_| ())
    }

    /// Apply `selection` and return the resulting group in one step.
    ///
    /// A concurrent [`release`](Self::release) either happens entirely
    /// before (and this fails) or entirely after the snapshot is taken.
    ///
    /// # Errors
    /// Same as [`select_main`](Self::select_main).
    pub fn select_and_get(
        &self,
        token: Token,
        selection: Selection,
    ) -> Result<RouteGroup, SessionError> {
        let mut state = self.lock();
        apply_selection(&mut state, token, selection).map(|session| session.group.clone())
    }

    /// Remove the session for `token`, returning whether one existed.
    pub fn release(&self, token: Token) -> bool {
        let removed = self.lock().sessions.remove(&token).is_some();
        if removed {
            debug!("released route group {token}");
        }
        removed
    }

    /// Drop every session and restart token numbering.
    ///
    /// Only valid at full teardown, when no token is still held by callers.
    pub fn clear_all(&self) {
        let mut state = self.lock();
        let dropped = state.sessions.len();
        *state = StoreState::default();
        debug!("cleared {dropped} route groups");
    }

    /// Release every session untouched for at least `max_idle`.
    ///
    /// Returns the released tokens in ascending order.
    pub fn release_idle(&self, max_idle: Duration) -> Vec<Token> {
        let now = Instant::now();
        let mut state = self.lock();
        let mut expired: Vec<Token> = state
            .sessions
            .iter()
            .filter(|(_, session)| now.saturating_duration_since(session.touched_at) >= max_idle)
            .map(|(token, _)| *token)
            .collect();
        for token in &expired {
            state.sessions.remove(token);
        }
        drop(state);
        expired.sort_unstable();
        if !expired.is_empty() {
            debug!("released {} idle route groups", expired.len());
        }
        expired
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Tokens of every live session, ascending.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.lock().sessions.keys().copied().collect();
        tokens.sort_unstable();
        tokens
    }
}

fn apply_selection(
    state: &mut StoreState,
    token: Token,
    selection: Selection,
) -> Result<&Session, SessionError> {
    let session = state
        .sessions
        .get_mut(&token)
        .ok_or(SessionError::UnknownToken(token))?;
    session.touched_at = Instant::now();
    let index = match selection {
        Selection::Keep => return Ok(session),
        Selection::ById(route_id) => session.group.position_of(route_id),
        Selection::ByIndex(index) => Some(index),
    };
    let applied = index.is_some_and(|position| session.group.set_main(position));
    if !applied {
        return Err(SessionError::InvalidSelection { token, selection });
    }
    debug!(
        "route group {token}: main route is now {}",
        session.group.main().route_id
    );
    Ok(session)
}
