use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

use super::pages::found;
use super::validation::validate_registration;
use super::views::{LoginView, render_with_status};
use super::{ApiError, AppState};
use crate::services::{AuthError, Registration};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/login
///
/// Every failure re-renders the login page with a 500.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return login_failed("Invalid username or password");
    };

    if form.username.is_empty() || form.password.is_empty() {
        return login_failed("Username and password cannot be empty");
    }

    let user_id = match state
        .shared
        .auth_service
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user_id) => user_id,
        Err(AuthError::InvalidCredentials) => {
            info!(username = %form.username, "Login rejected");
            return login_failed("Incorrect username or password");
        }
        Err(e) => {
            warn!(username = %form.username, error = %e, "Login lookup failed");
            return login_failed("Incorrect username or password");
        }
    };

    if let Err(e) = state.sessions().login(&session, user_id).await {
        warn!(user_id, error = %e, "Failed to store login in session");
        return login_failed("Session error");
    }

    info!(user_id, "User logged in");
    Redirect::to("/").into_response()
}

/// GET /api/logout
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Redirect {
    state.sessions().logout(&session).await;
    Redirect::to("/")
}

/// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<Response, ApiError> {
    if state.sessions().is_logged_in(&session).await {
        return Ok(found("/"));
    }

    let Form(form) = form.map_err(|e| ApiError::validation(e.body_text()))?;

    validate_registration(&form.username, &form.email, &form.password, &form.password2)?;

    let registration = Registration {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password,
    };

    let user_id = match state.shared.auth_service.register(registration).await {
        Ok(user_id) => user_id,
        Err(e) if e.is_user_facing() => return Err(ApiError::validation(e.to_string())),
        Err(e) => return Err(ApiError::internal(e.to_string())),
    };

    state
        .sessions()
        .login(&session, user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Redirect::to("/").into_response())
}

// ============================================================================
// Helpers
// ============================================================================

fn login_failed(message: &str) -> Response {
    render_with_status(
        StatusCode::INTERNAL_SERVER_ERROR,
        &LoginView {
            logged_in: false,
            error: Some(message.to_string()),
        },
    )
}
