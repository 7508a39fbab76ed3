//! Smoke tests for the public pages.

mod common;

use axum::http::{StatusCode, header};
use common::{body_text, spawn_app};

#[tokio::test]
async fn smoke_public_pages() {
    let app = spawn_app().await;

    for path in ["/", "/about", "/login", "/register"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(
            response
                .headers()
                .get("x-content-type-options")
                .and_then(|h| h.to_str().ok()),
            Some("nosniff")
        );
        assert!(body_text(response).await.contains("GoSearch"), "{path}");
    }

    let response = app.get("/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn smoke_weather_without_api_key() {
    let app = spawn_app().await;

    let response = app.get("/api/weather?city=Copenhagen", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Solen skinner i Copenhagen!"));

    let response = app.get("/api/weather", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Solen skinner i din valgte by!"));
}

#[tokio::test]
async fn smoke_static_and_metrics() {
    let app = spawn_app().await;

    let response = app.get("/static/style.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/css"))
    );

    let response = app.get("/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Metrics not enabled"));
}
