use axum::{
    Form,
    extract::{Request, State, rejection::FormRejection},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::warn;

use super::views::{ResetPasswordView, render_template};
use super::{ApiError, AppState};
use crate::services::reset_gate::is_exempt;
use crate::services::{PasswordReset, ResetState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Sends authenticated users with a pending reset to `/reset-password`.
/// Anonymous requests and the allow-listed paths pass through. A failed
/// lookup is logged and the request continues.
pub async fn password_reset_gate(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(user_id) = state.sessions().current_user(&session).await else {
        return next.run(request).await;
    };

    match state.shared.reset_gate.state(user_id).await {
        Ok(Some(ResetState::ResetRequired)) => Redirect::to("/reset-password").into_response(),
        Ok(_) => next.run(request).await,
        Err(e) => {
            warn!(user_id, error = %e, "Could not read password reset state");
            next.run(request).await
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /reset-password
pub async fn reset_password_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(user_id) = state.sessions().current_user(&session).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    match state.shared.reset_gate.state(user_id).await? {
        Some(ResetState::ResetRequired) => Ok(render_form(None)),
        Some(ResetState::Normal) => Ok(Redirect::to("/").into_response()),
        None => {
            state.sessions().logout(&session).await;
            Ok(Redirect::to("/login").into_response())
        }
    }
}

/// POST /api/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<ResetPasswordForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Some(user_id) = state.sessions().current_user(&session).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    let Form(form) = form.map_err(|e| ApiError::validation(e.body_text()))?;

    let reset = PasswordReset {
        current_password: form.current_password,
        new_password: form.new_password,
        confirm_password: form.confirm_password,
    };

    match state.shared.auth_service.reset_password(user_id, reset).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(e) if e.is_user_facing() => Ok(render_form(Some(e.to_string()))),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn render_form(error: Option<String>) -> Response {
    render_template(&ResetPasswordView {
        logged_in: true,
        error,
    })
}
