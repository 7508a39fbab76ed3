use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::views::{WeatherView, render_template};
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

/// GET /api/weather
pub async fn weather(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<WeatherQuery>,
) -> Result<Response, ApiError> {
    let report = state
        .shared
        .weather_service
        .report(query.city.as_deref())
        .await
        .map_err(|e| ApiError::weather_error(format!("{e:#}")))?;

    let logged_in = state.sessions().is_logged_in(&session).await;
    Ok(render_template(&WeatherView { logged_in, report }))
}
