//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Timelike;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, UserInsert};
use crate::services::auth_service::{AuthError, AuthService, PasswordReset, Registration};
use crate::services::credentials;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn authenticate(&self, username: &str, password: &str) -> Result<i32, AuthError> {
        let (user, password_hash) = self
            .store
            .get_user_with_password(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !credentials::verify_password(&password_hash, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user.id)
    }

    async fn register(&self, registration: Registration) -> Result<i32, AuthError> {
        let existing = self
            .store
            .username_or_email_exists(&registration.username, &registration.email)
            .await
            .map_err(|e| AuthError::Database(format!("{e:#}")))?;

        if existing.username_taken {
            return Err(AuthError::UsernameTaken);
        }
        if existing.email_taken {
            return Err(AuthError::EmailTaken);
        }

        let password_hash =
            credentials::hash_password(&registration.password, &self.security).await?;

        let outcome = self
            .store
            .create_user(NewUser {
                username: registration.username.clone(),
                email: registration.email,
                password_hash,
                password_changed: true,
            })
            .await?;

        let user_id = match outcome {
            UserInsert::Created(id) => id,
            UserInsert::Duplicate => {
                // Lost a race with a concurrent registration; report which field collided
                let existing = self
                    .store
                    .username_or_email_exists(&registration.username, "")
                    .await
                    .unwrap_or_default();
                return Err(if existing.username_taken {
                    AuthError::UsernameTaken
                } else {
                    AuthError::EmailTaken
                });
            }
        };

        let now = chrono::Local::now();
        metrics::counter!(
            "new_users_total_count",
            "hour_of_day" => now.hour().to_string(),
            "day_of_week" => now.format("%A").to_string()
        )
        .increment(1);

        info!(user_id, username = %registration.username, "User registered");
        Ok(user_id)
    }

    async fn reset_password(&self, user_id: i32, reset: PasswordReset) -> Result<(), AuthError> {
        if reset.new_password != reset.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let min_len = self.security.min_password_length;
        if reset.new_password.chars().count() < min_len {
            return Err(AuthError::PasswordTooShort(min_len));
        }

        let current_hash = self
            .store
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !credentials::verify_password(&current_hash, &reset.current_password).await? {
            return Err(AuthError::IncorrectCurrentPassword);
        }

        let new_hash = credentials::hash_password(&reset.new_password, &self.security).await?;
        self.store.update_password(user_id, new_hash).await?;

        info!(user_id, "Password reset completed");
        Ok(())
    }
}
