//! Runs in its own binary because it installs the global metrics recorder.

mod common;

use axum::http::StatusCode;
use common::{body_text, test_config};
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::test]
async fn test_unknown_paths_do_not_grow_metric_series() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install recorder");

    let state = gosearch::api::create_app_state_from_config(test_config(), Some(handle))
        .await
        .expect("failed to create app state");
    let router = gosearch::api::router(state.clone()).await;
    let app = common::TestApp {
        state,
        router,
        search_log: std::path::PathBuf::new(),
    };

    for i in 0..20 {
        let response = app.get(&format!("/nope-{i}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    app.get("/about", None).await;

    let response = app.get("/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;

    assert!(!body.contains("nope-"));
    assert!(body.contains(r#"path="unmatched""#));
    assert!(body.contains(r#"path="/about""#));
}
