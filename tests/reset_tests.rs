mod common;

use axum::http::StatusCode;
use common::{TestApp, body_text, location, spawn_app};

/// Logs in as the seeded admin, who starts out with a pending reset.
async fn admin_session(app: &TestApp) -> String {
    app.login("admin", "password").await
}

async fn submit_reset(
    app: &TestApp,
    cookie: &str,
    current: &str,
    new: &str,
    confirm: &str,
) -> (StatusCode, Option<String>, String) {
    let response = app
        .post_form(
            "/api/reset-password",
            &format!("current_password={current}&new_password={new}&confirm_password={confirm}"),
            Some(cookie),
        )
        .await;
    let status = response.status();
    let location = location(&response).map(str::to_string);
    (status, location, body_text(response).await)
}

#[tokio::test]
async fn test_seeded_admin_is_gated() {
    let app = spawn_app().await;
    let cookie = admin_session(&app).await;

    for path in ["/", "/about", "/search?q=test", "/api/weather"] {
        let response = app.get(path, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), Some("/reset-password"), "{path}");
    }

    let response = app.get("/reset-password", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Reset your password"));

    // Allow-listed paths are not redirected
    let response = app.get("/login", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get("/static/style.css", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_requests_pass_the_gate() {
    let app = spawn_app().await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/reset-password", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_reset_errors_rerender_the_form() {
    let app = spawn_app().await;
    let cookie = admin_session(&app).await;

    let (status, _, body) =
        submit_reset(&app, &cookie, "password", "newpassword1", "different1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("New passwords do not match"));

    let (status, _, body) =
        submit_reset(&app, &cookie, "password", "short", "short").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("New password must be at least 8 characters long"));

    let (status, _, body) =
        submit_reset(&app, &cookie, "wrong", "newpassword1", "newpassword1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Current password is incorrect"));

    // Still gated after failed attempts
    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(location(&response), Some("/reset-password"));
}

#[tokio::test]
async fn test_successful_reset_lifts_the_gate() {
    let app = spawn_app().await;
    let cookie = admin_session(&app).await;

    let (status, location_header, _) =
        submit_reset(&app, &cookie, "password", "newpassword1", "newpassword1").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location_header.as_deref(), Some("/"));

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/reset-password", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    // Old password is gone
    let response = app
        .post_form("/api/login", "username=admin&password=password", None)
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    app.login("admin", "newpassword1").await;
}

#[tokio::test]
async fn test_force_reset_all_gates_existing_sessions() {
    let app = spawn_app().await;
    let response = app
        .post_form(
            "/api/register",
            "username=user1&email=user1%40example.com&password=password1&password2=password1",
            None,
        )
        .await;
    let cookie = common::session_cookie(&response).unwrap();

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let affected = app.state.shared.reset_gate.force_reset_all().await.unwrap();
    assert_eq!(affected, 2);

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/reset-password"));
}
