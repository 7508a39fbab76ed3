mod common;

use common::{spawn_app, spawn_app_with, test_config};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_HTML: &str = r#"<html><body>
<h1 id="firstHeading" class="firstHeading"><span>Farveblindhed</span></h1>
<div class="mw-parser-output">
  <p>Farveblindhed er en <a href="/wiki/Syn">nedsat</a> evne til at skelne farver.</p>
  <p>Den er oftest arvelig.</p>
</div>
</body></html>"#;

async fn write_log(path: &std::path::Path, terms: &[&str]) {
    let lines: String = terms
        .iter()
        .map(|t| format!("SEARCH: 2025/03/01 12:00:00 query=\"{t}\" from=127.0.0.1:5000\n"))
        .collect();
    tokio::fs::write(path, lines).await.unwrap();
}

#[tokio::test]
async fn test_processed_terms_are_skipped() {
    let app = spawn_app().await;
    app.state.store().mark_term_processed("farveblind").await.unwrap();
    write_log(&app.search_log, &["Farveblind", "farveblind "]).await;

    let report = app.state.shared.scraper.run().await.unwrap();

    assert_eq!(report.terms, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.scraped, 0);
    assert_eq!(report.pages_added, 0);
}

#[tokio::test]
async fn test_failed_terms_stay_unprocessed() {
    let app = spawn_app().await;
    write_log(&app.search_log, &["Sommerfugl"]).await;

    let report = app.state.shared.scraper.run().await.unwrap();

    assert_eq!(report.terms, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pages_added, 0);
    assert!(!app.state.store().is_term_processed("sommerfugl").await.unwrap());
}

#[tokio::test]
async fn test_missing_log_is_an_empty_pass() {
    let mut config = test_config();
    config.search.log_path = std::env::temp_dir()
        .join(format!("gosearch-missing-{}", uuid::Uuid::new_v4()))
        .join("search.log")
        .display()
        .to_string();
    let app = spawn_app_with(config).await;
    tokio::fs::remove_file(&app.search_log).await.ok();

    let report = app.state.shared.scraper.run().await.unwrap();
    assert_eq!(report.terms, 0);
}

#[tokio::test]
async fn test_successful_pass_stores_marks_and_reindexes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Farveblind"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Ukendt_Ord"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/pages/_doc/.+$"))
        .and(body_partial_json(json!({"title": "Farveblindhed", "language": "da"})))
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
    config.scraper.wikipedia_base_url = format!("{}/wiki/", server.uri());
    config.search.elasticsearch_url = Some(server.uri());
    let app = spawn_app_with(config).await;
    write_log(&app.search_log, &["Farveblind", "ukendt ord"]).await;

    let report = app.state.shared.scraper.run().await.unwrap();
    assert_eq!(report.terms, 2);
    assert_eq!(report.scraped, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pages_added, 1);

    let pages = app.state.store().list_pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, format!("{}/wiki/Farveblind", server.uri()));
    assert_eq!(pages[0].title, "Farveblindhed");
    assert_eq!(pages[0].language, "da");
    assert!(pages[0].content.contains("nedsat evne til at skelne farver"));

    assert!(app.state.store().is_term_processed("farveblind").await.unwrap());
    assert!(!app.state.store().is_term_processed("ukendt ord").await.unwrap());

    // Second pass skips the processed term and fetches nothing new
    let report = app.state.shared.scraper.run().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.pages_added, 0);
}
