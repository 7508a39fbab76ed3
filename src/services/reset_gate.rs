//! Password-reset enforcement.
//!
//! A user is either `Normal` or `ResetRequired`. The only way out of
//! `ResetRequired` is a successful reset submission; the only way in is the
//! operator's bulk reset.

use anyhow::{Context, Result};
use sea_orm_migration::SchemaManager;
use tracing::{info, warn};

use crate::db::Store;

/// Paths reachable while a reset is pending.
const EXEMPT_PATHS: &[&str] = &[
    "/login",
    "/api/login",
    "/register",
    "/api/register",
    "/api/logout",
    "/reset-password",
    "/api/reset-password",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    ResetRequired,
    Normal,
}

impl From<bool> for ResetState {
    fn from(password_changed: bool) -> Self {
        if password_changed {
            Self::Normal
        } else {
            Self::ResetRequired
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub password_changed_column: bool,
    pub reset_tokens_table: bool,
}

impl SchemaStatus {
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.password_changed_column && self.reset_tokens_table
    }
}

#[must_use]
pub fn is_exempt(path: &str) -> bool {
    path.starts_with("/static/") || EXEMPT_PATHS.contains(&path)
}

#[derive(Clone)]
pub struct ResetGate {
    store: Store,
}

impl ResetGate {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// `None` when the user no longer exists.
    pub async fn state(&self, user_id: i32) -> Result<Option<ResetState>> {
        Ok(self
            .store
            .password_changed(user_id)
            .await?
            .map(ResetState::from))
    }

    /// Puts every account into `ResetRequired`.
    pub async fn force_reset_all(&self) -> Result<u64> {
        let affected = self.store.force_password_reset_all().await?;
        info!(users = affected, "All users flagged for password reset");
        Ok(affected)
    }

    /// Confirms the reset schema is in place after migrations ran.
    pub async fn verify_schema(&self) -> Result<SchemaStatus> {
        let manager = SchemaManager::new(&self.store.conn);

        let status = SchemaStatus {
            password_changed_column: manager
                .has_column("users", "password_changed")
                .await
                .context("Failed to inspect users table")?,
            reset_tokens_table: manager
                .has_table("reset_tokens")
                .await
                .context("Failed to inspect reset_tokens table")?,
        };

        if status.is_complete() {
            info!("Password reset schema verified");
        } else {
            warn!(
                password_changed_column = status.password_changed_column,
                reset_tokens_table = status.reset_tokens_table,
                "Password reset schema is incomplete"
            );
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/login"));
        assert!(is_exempt("/api/reset-password"));
        assert!(is_exempt("/static/style.css"));
        assert!(!is_exempt("/"));
        assert!(!is_exempt("/api/search"));
        assert!(!is_exempt("/loginx"));
        assert!(!is_exempt("/static"));
    }

    #[test]
    fn test_state_from_flag() {
        assert_eq!(ResetState::from(true), ResetState::Normal);
        assert_eq!(ResetState::from(false), ResetState::ResetRequired);
    }
}
