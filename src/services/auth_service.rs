//! Domain service for authentication and account management.
//!
//! Handles credential checks, self-registration and password resets.

use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("The username is already taken")]
    UsernameTaken,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("New passwords do not match")]
    PasswordMismatch,

    #[error("New password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("Current password is incorrect")]
    IncorrectCurrentPassword,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the message is safe to show to the user as-is.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::UsernameTaken
                | Self::EmailTaken
                | Self::PasswordMismatch
                | Self::PasswordTooShort(_)
                | Self::IncorrectCurrentPassword
        )
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the user id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a wrong password.
    async fn authenticate(&self, username: &str, password: &str) -> Result<i32, AuthError>;

    /// Creates a self-registered account and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] or [`AuthError::EmailTaken`] on a
    /// case-insensitive collision, including one lost to a concurrent insert.
    async fn register(&self, registration: Registration) -> Result<i32, AuthError>;

    /// Replaces the password of a user and clears the reset requirement.
    ///
    /// # Errors
    ///
    /// Checks run in order: confirmation match, minimum length, current password.
    async fn reset_password(&self, user_id: i32, reset: PasswordReset) -> Result<(), AuthError>;
}
