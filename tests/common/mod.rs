#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use gosearch::config::Config;
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub state: Arc<gosearch::api::AppState>,
    pub router: Router,
    pub search_log: PathBuf,
}

pub fn test_config() -> Config {
    let id = uuid::Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("gosearch-test-{id}.db"));
    let log_path = std::env::temp_dir().join(format!("gosearch-test-{id}.log"));

    let mut config = Config::default();
    config.database.url = Some(format!("sqlite:{}?mode=rwc", db_path.display()));
    config.database.connect_retries = 1;
    config.session.secret = "integration-test-session-secret".to_string();
    config.search.log_path = log_path.display().to_string();
    config.scraper.wikipedia_base_url = "http://127.0.0.1:9/wiki/".to_string();
    config.scraper.request_timeout_seconds = 2;
    config.scheduler.enabled = false;
    config.general.static_path = concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let search_log = PathBuf::from(&config.search.log_path);
    let state = gosearch::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");
    let router = gosearch::api::router(state.clone()).await;

    TestApp {
        state,
        router,
        search_log,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Logs in and returns the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/api/login",
                &format!("username={username}&password={password}"),
                None,
            )
            .await;
        assert_eq!(response.status(), 303, "login as {username} failed");
        session_cookie(&response).expect("login did not set a session cookie")
    }
}

/// `name=value` part of the first Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|h| h.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}
