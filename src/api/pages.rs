use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::AppState;
use super::views::{AboutView, IndexView, LoginView, RegisterView, render_template};

/// 302 Found, for flows that must not look like a form-post redirect
pub fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// GET /
pub async fn index(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let logged_in = state.sessions().is_logged_in(&session).await;
    render_template(&IndexView { logged_in })
}

/// GET /about
pub async fn about(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let logged_in = state.sessions().is_logged_in(&session).await;
    render_template(&AboutView { logged_in })
}

/// GET /login
pub async fn login_page(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let logged_in = state.sessions().is_logged_in(&session).await;
    render_template(&LoginView {
        logged_in,
        error: None,
    })
}

/// GET /register
pub async fn register_page(State(state): State<Arc<AppState>>, session: Session) -> Response {
    if state.sessions().is_logged_in(&session).await {
        return found("/");
    }
    render_template(&RegisterView { logged_in: false })
}
