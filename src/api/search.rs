use axum::{
    Form,
    extract::{ConnectInfo, FromRequest, Query, Request, State},
    http::Method,
    response::Response,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::validate_search_query;
use super::views::{SearchView, render_template};
use super::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /search, GET /api/search, POST /api/search
///
/// The query comes from `q` in the query string, or from a form body on POST.
pub async fn search(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
) -> Result<Response, ApiError> {
    let caller = caller_address(&request, &state.config().server.trusted_proxies);

    let mut query = Query::<SearchParams>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(params)| params.q);

    if query.as_deref().is_none_or(|q| q.trim().is_empty()) && request.method() == Method::POST {
        if let Ok(Form(params)) = Form::<SearchParams>::from_request(request, &()).await {
            query = params.q;
        }
    }

    let query = validate_search_query(query.as_deref().unwrap_or_default())?;

    let results = state
        .shared
        .search_service
        .search(query, &caller)
        .await?;

    let logged_in = state.sessions().is_logged_in(&session).await;
    Ok(render_template(&SearchView {
        logged_in,
        query: query.to_string(),
        results,
    }))
}

/// Client address for the audit log. `X-Forwarded-For` is only believed
/// when the peer is one of the configured proxies.
fn caller_address(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let Some(ConnectInfo(peer)) = request.extensions().get::<ConnectInfo<SocketAddr>>() else {
        return "unknown".to_string();
    };

    if trusted_proxies.contains(&peer.ip())
        && let Some(forwarded) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|h| !h.is_empty())
    {
        return forwarded.to_string();
    }

    peer.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: Option<[u8; 4]>, forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder();
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(ip) = peer {
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((ip, 4000))));
        }
        request
    }

    #[test]
    fn test_caller_address_uses_peer() {
        assert_eq!(caller_address(&request_from(None, None), &[]), "unknown");
        assert_eq!(
            caller_address(&request_from(Some([127, 0, 0, 1]), None), &[]),
            "127.0.0.1:4000"
        );
    }

    #[test]
    fn test_forwarded_for_needs_trusted_proxy() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        let forged = request_from(Some([198, 51, 100, 7]), Some("203.0.113.9"));
        assert_eq!(caller_address(&forged, &[proxy]), "198.51.100.7:4000");
        assert_eq!(caller_address(&forged, &[]), "198.51.100.7:4000");

        let proxied = request_from(Some([10, 0, 0, 1]), Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(caller_address(&proxied, &[proxy]), "203.0.113.9");

        let no_peer = request_from(None, Some("203.0.113.9"));
        assert_eq!(caller_address(&no_peer, &[proxy]), "unknown");
    }
}
