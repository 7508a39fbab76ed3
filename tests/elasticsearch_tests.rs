mod common;

use axum::http::StatusCode;
use common::{body_text, spawn_app, spawn_app_with, test_config};
use gosearch::db::NewPage;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn elasticsearch_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"tagline": "You Know, for Search"})),
        )
        .mount(&server)
        .await;
    server
}

fn db_only_page() -> NewPage {
    NewPage {
        url: "https://da.wikipedia.org/wiki/Databasen".to_string(),
        title: "DatabaseOnly".to_string(),
        language: "da".to_string(),
        content: "Farveblind står kun i databasen.".to_string(),
    }
}

#[tokio::test]
async fn test_index_backend_answers_queries() {
    let server = elasticsearch_mock().await;
    Mock::given(method("POST"))
        .and(path("/pages/_search"))
        .and(body_partial_json(json!({"query": {"multi_match": {"query": "Farveblind"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [{"_source": {
                "url": "https://da.wikipedia.org/wiki/Farveblindhed",
                "title": "IndexOnly",
                "language": "da",
                "content": "Farveblindhed fra indekset."
            }}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search.elasticsearch_url = Some(server.uri());
    let app = spawn_app_with(config).await;
    app.state.store().upsert_page(db_only_page()).await.unwrap();
    assert_eq!(app.state.shared.search_service.backend_name(), "elasticsearch");

    let response = app.get("/api/search?q=Farveblind", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(">IndexOnly</a>"));
    assert!(!body.contains("DatabaseOnly"));
}

#[tokio::test]
async fn test_database_fallback_answers_queries() {
    let app = spawn_app().await;
    app.state.store().upsert_page(db_only_page()).await.unwrap();
    assert_eq!(app.state.shared.search_service.backend_name(), "database");

    let response = app.get("/api/search?q=Farveblind", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(">DatabaseOnly</a>"));

    // Nothing to push for the database backend
    let indexed = app
        .state
        .shared
        .search_service
        .sync_index(app.state.store())
        .await
        .unwrap();
    assert_eq!(indexed, 0);
}

#[tokio::test]
async fn test_index_backend_failure_is_a_server_error() {
    let server = elasticsearch_mock().await;
    Mock::given(method("POST"))
        .and(path("/pages/_search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search.elasticsearch_url = Some(server.uri());
    let app = spawn_app_with(config).await;

    let response = app.get("/api/search?q=Farveblind", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "An internal error occurred");
}

#[tokio::test]
async fn test_sync_index_pushes_every_page() {
    let server = elasticsearch_mock().await;
    let page = db_only_page();
    Mock::given(method("PUT"))
        .and(path(format!("/pages/_doc/{}", urlencoding::encode(&page.url))))
        .and(body_partial_json(json!({"title": "DatabaseOnly", "language": "da"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pages/_refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search.elasticsearch_url = Some(server.uri());
    let app = spawn_app_with(config).await;
    app.state.store().upsert_page(page).await.unwrap();

    let indexed = app
        .state
        .shared
        .search_service
        .sync_index(app.state.store())
        .await
        .unwrap();
    assert_eq!(indexed, 1);
}
