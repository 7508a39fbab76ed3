mod common;

use axum::http::StatusCode;
use common::{body_text, spawn_app};
use gosearch::db::NewPage;

async fn seed_page(app: &common::TestApp) {
    app.state
        .store()
        .upsert_page(NewPage {
            url: "https://da.wikipedia.org/wiki/TestContent".to_string(),
            title: "TestContent".to_string(),
            language: "da".to_string(),
            content: "This page holds some TestContent for the search engine.".to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_search_finds_stored_page() {
    let app = spawn_app().await;
    seed_page(&app).await;
    assert_eq!(app.state.shared.search_service.backend_name(), "database");

    let response = app.get("/api/search?q=TestContent", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("https://da.wikipedia.org/wiki/TestContent"));
    assert!(body.contains(">TestContent</a>"));

    let response = app.get("/search?q=nothing-matches-this", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No results found."));
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let app = spawn_app().await;

    for uri in ["/api/search", "/api/search?q=", "/search?q=%20%20"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_text(response).await, "No search query provided");
    }
}

#[tokio::test]
async fn test_post_form_search() {
    let app = spawn_app().await;
    seed_page(&app).await;

    let response = app.post_form("/api/search", "q=TestContent", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("TestContent"));
}

#[tokio::test]
async fn test_searches_are_written_to_the_audit_log() {
    let app = spawn_app().await;

    let response = app.get("/api/search?q=Farveblind", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let log = tokio::fs::read_to_string(&app.search_log).await.unwrap();
    assert!(log.starts_with("SEARCH: "));
    assert!(log.contains("query=\"Farveblind\" from=unknown"));
}

#[tokio::test]
async fn test_forwarded_for_is_ignored_without_trusted_proxy() {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/search?q=spoof")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let log = tokio::fs::read_to_string(&app.search_log).await.unwrap();
    assert!(log.contains("query=\"spoof\" from=unknown"));
    assert!(!log.contains("203.0.113.9"));
}
