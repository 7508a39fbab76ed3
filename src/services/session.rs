//! Session mediation: typed access to the login state stored in the
//! cookie-backed session, plus the active-session tracker.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tower_sessions::Session;
use tracing::{debug, warn};

pub const SESSION_USER_KEY: &str = "user";

/// The only value kept in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i32,
}

/// Users with at least one live session on this instance.
#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Mutex<HashSet<i32>>,
}

impl SessionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the user was not tracked yet.
    pub fn track(&self, user_id: i32) -> bool {
        let inserted = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id);
        if inserted {
            metrics::gauge!("active_user_sessions", "auth_status" => "authenticated")
                .increment(1.0);
        }
        inserted
    }

    /// Returns true if the user was tracked.
    pub fn untrack(&self, user_id: i32) -> bool {
        let removed = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
        if removed {
            metrics::gauge!("active_user_sessions", "auth_status" => "authenticated")
                .decrement(1.0);
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct SessionMediator {
    tracker: SessionTracker,
}

impl SessionMediator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Decodes the session value, keeping "absent" and "unreadable" apart.
    pub async fn read_user(
        session: &Session,
    ) -> Result<Option<SessionUser>, tower_sessions::session::Error> {
        session.get::<SessionUser>(SESSION_USER_KEY).await
    }

    /// Missing, corrupt or unreadable session data all mean "not logged in".
    pub async fn current_user(&self, session: &Session) -> Option<i32> {
        match Self::read_user(session).await {
            Ok(user) => user.map(|u| u.user_id),
            Err(e) => {
                debug!(error = %e, "Discarding unreadable session value");
                None
            }
        }
    }

    pub async fn is_logged_in(&self, session: &Session) -> bool {
        self.current_user(session).await.is_some()
    }

    /// Rotates the session id and stores the user.
    pub async fn login(
        &self,
        session: &Session,
        user_id: i32,
    ) -> Result<(), tower_sessions::session::Error> {
        session.cycle_id().await?;
        session
            .insert(SESSION_USER_KEY, SessionUser { user_id })
            .await?;

        metrics::counter!("user_sessions_total", "auth_status" => "authenticated").increment(1);
        self.tracker.track(user_id);
        Ok(())
    }

    /// Removes the user and destroys the session; the layer then expires the cookie.
    pub async fn logout(&self, session: &Session) {
        let user_id = self.current_user(session).await;

        if let Err(e) = session.flush().await {
            warn!(error = %e, "Failed to flush session on logout");
        }

        if let Some(user_id) = user_id {
            self.tracker.untrack(user_id);
            metrics::counter!("user_sessions_total", "auth_status" => "logged_out").increment(1);
        }
    }
}
