//! Choosing the main route and handing it to the navigation engine.

use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::{LaunchMode, NavigationEngine, Selection, SessionError, SessionStore, Token};

/// Errors returned by [`Launcher::start_navigation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// The token or selector did not resolve.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The navigation engine refused to start.
    #[error("navigation for session {token} could not start: {reason}")]
    LaunchFailed {
        /// Session whose main route was offered.
        token: Token,
        /// Diagnostic supplied by the engine.
        reason: String,
    },
}

/// Applies selections and starts guidance on stored groups.
pub struct Launcher {
    store: Arc<SessionStore>,
    navigation: Arc<dyn NavigationEngine>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Create a launcher over `store`.
    #[must_use]
    pub const fn new(store: Arc<SessionStore>, navigation: Arc<dyn NavigationEngine>) -> Self {
        Self { store, navigation }
    }

    /// Make the alternative named by `selection` the main route.
    ///
    /// # Errors
    /// See [`SessionStore::select_main`].
    pub fn select(&self, token: Token, selection: Selection) -> Result<(), SessionError> {
        self.store.select_main(token, selection)
    }

    /// Apply `selection`, then navigate the group's main route.
    ///
    /// The selection stays applied even if the engine refuses to launch.
    ///
    /// # Errors
    /// Returns [`LaunchError::Session`] for an unknown token or unmatched
    /// selector, and [`LaunchError::LaunchFailed`] when the engine refuses.
    pub fn start_navigation(
        &self,
        token: Token,
        mode: LaunchMode,
        selection: Selection,
    ) -> Result<(), LaunchError> {
        let group = self.store.select_and_get(token, selection)?;
        let route = group.main();
        match self.navigation.launch(route, &group, mode) {
            Ok(()) => {
                debug!("navigating route {} of {token} ({mode})", route.route_id);
                Ok(())
            }
            Err(refused) => {
                warn!("navigation engine refused {token}: {refused}");
                Err(LaunchError::LaunchFailed {
                    token,
                    reason: refused.reason,
                })
            }
        }
    }

    /// Release the session for `token`; see [`SessionStore::release`].
    #[must_use]
    pub fn release(&self, token: Token) -> bool {
        self.store.release(token)
    }
}
