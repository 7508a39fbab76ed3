use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tower_sessions::Session;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::AppState;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Request span, HTTP metrics and one wide event per request.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let metrics_path = metrics_path_for(&req);

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
    );

    async move {
        let response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();

        let outcome = if status >= 500 {
            "error"
        } else if status >= 400 {
            "client_error"
        } else {
            "success"
        };

        let labels = [
            ("method", method),
            ("path", metrics_path),
            ("status", status.to_string()),
        ];

        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        info!(
            event = "http_request_finished",
            duration_ms = duration_ms,
            status_code = status,
            user_agent = %user_agent,
            outcome = %outcome,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Label value for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Route template used as the `path` label. Raw paths never become labels,
/// so unknown URLs cannot grow the series count.
fn metrics_path_for(req: &Request) -> String {
    if req.uri().path().starts_with("/static/") {
        return "/static/*".to_string();
    }

    req.extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |mp| mp.as_str().to_string())
}

/// Counts requests per path split by login state.
pub async fn track_user_requests(
    State(state): State<Arc<AppState>>,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    let auth_status = if state.sessions().is_logged_in(&session).await {
        "authenticated"
    } else {
        "anonymous"
    };
    let path = metrics_path_for(&req);

    metrics::counter!("user_requests_total", "auth_status" => auth_status, "path" => path)
        .increment(1);

    next.run(req).await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'self'; img-src 'self' data:; style-src 'self'; form-action 'self'; frame-ancestors 'none'; base-uri 'self'",
        ),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    async fn echo_label(req: Request, next: Next) -> Response {
        let label = metrics_path_for(&req);
        let mut response = next.run(req).await;
        response
            .headers_mut()
            .insert("x-metrics-path", HeaderValue::from_str(&label).unwrap());
        response
    }

    async fn label_for(uri: &str) -> String {
        let app = Router::new()
            .route("/items/{id}", get(|| async { "ok" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(echo_label));

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.headers()["x-metrics-path"]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_metrics_path_uses_route_template() {
        assert_eq!(label_for("/items/42").await, "/items/{id}");
        assert_eq!(label_for("/items/43").await, "/items/{id}");
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_label() {
        assert_eq!(label_for("/nope-1").await, UNMATCHED_PATH);
        assert_eq!(label_for("/nope-2?x=1").await, UNMATCHED_PATH);
        assert_eq!(label_for("/static/style.css").await, "/static/*");
    }
}
