use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::SessionMediator;
use crate::state::SharedState;

pub mod auth;
mod error;
mod observability;
pub mod pages;
pub mod reset;
mod search;
mod validation;
pub mod views;
mod weather;

pub use error::ApiError;

use metrics_exporter_prometheus::PrometheusHandle;

/// Fixed salt for stretching the session secret into a cookie signing key.
const SESSION_KEY_SALT: &[u8] = b"gosearch-session-signing-key";

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub session_key: Key,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionMediator {
        &self.shared.sessions
    }
}

/// Derives the 64-byte cookie signing key from the configured secret.
pub fn derive_session_key(secret: &str) -> anyhow::Result<Key> {
    let mut bytes = [0u8; 64];
    argon2::Argon2::default()
        .hash_password_into(secret.as_bytes(), SESSION_KEY_SALT, &mut bytes)
        .map_err(|e| anyhow::anyhow!("Failed to derive session key: {e}"))?;

    Key::try_from(&bytes[..]).map_err(|e| anyhow::anyhow!("Invalid session key: {e}"))
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let session_key = derive_session_key(&shared.config.session.secret)?;

    Ok(Arc::new(AppState {
        shared,
        session_key,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared, prometheus_handle).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let config = state.config();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(config.session.cookie_name.clone())
        .with_secure(config.server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            config.session.max_age_days,
        )))
        .with_signed(state.session_key.clone());

    let static_dir = ServeDir::new(&config.general.static_path);

    Router::new()
        .route("/", get(pages::index))
        .route("/about", get(pages::about))
        .route("/login", get(pages::login_page))
        .route("/register", get(pages::register_page))
        .route("/search", get(search::search))
        .route("/reset-password", get(reset::reset_password_page))
        .route("/api/login", post(auth::login))
        .route("/api/logout", get(auth::logout))
        .route("/api/register", post(auth::register))
        .route("/api/search", get(search::search).post(search::search))
        .route("/api/weather", get(weather::weather))
        .route("/api/reset-password", post(reset::reset_password))
        .route("/metrics", get(observability::get_metrics))
        .nest_service("/static", static_dir)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            reset::password_reset_gate,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            observability::track_user_requests,
        ))
        .layer(session_layer)
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_deterministic() {
        let a = derive_session_key("a-long-enough-secret").unwrap();
        let b = derive_session_key("a-long-enough-secret").unwrap();
        let c = derive_session_key("another-secret").unwrap();

        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
