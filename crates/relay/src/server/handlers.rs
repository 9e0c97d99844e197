//! Axum request handlers for all service endpoints.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{EchoResponse, HealthResponse, MultiMap};
use common::{ErrorKind, ServiceError};
use tracing::{debug, error, info};

use super::state::AppState;
use crate::flow::{token_not_found_message, RedirectQuery};
use crate::token::HeaderSet;

/// Query pairs in request order, repeated names included.
type QueryPairs = Query<Vec<(String, String)>>;

/// `GET /token` — return the request's token with its metadata as JSON.
///
/// Responds `444` with the searched header names if no token is found and
/// no fallback token is configured.
pub async fn token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let headers = HeaderSet::from_header_map(&headers);
    match state.tokens().extract(&headers) {
        Ok(token) => {
            info!(fingerprint = %token.fingerprint(), "token extracted");
            (StatusCode::OK, Json(token)).into_response()
        }
        Err(e) => {
            debug!("no token in request");
            error_response(&ServiceError::new(
                ErrorKind::TokenNotFound,
                token_not_found_message(e.searched()),
            ))
        }
    }
}

/// `GET /flow/redirect/token` — redirect to `target` with the request's
/// token encrypted for the holder of `publicKey`.
///
/// Responds `301` on success, otherwise `400`, `444` or `500` with a
/// plain-text diagnostic.
pub async fn redirect_token(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
    headers: HeaderMap,
) -> Response {
    let query = RedirectQuery::from_pairs(pairs);
    let headers = HeaderSet::from_header_map(&headers);

    match state.flow.run(&query, &headers) {
        Ok(location) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, location.to_string())],
        )
            .into_response(),
        Err(e) => {
            if e.kind().is_client_fault() {
                debug!(error = %e, "redirect flow rejected");
            } else {
                error!(error = %e, "redirect flow failed");
            }
            error_response(&e.into())
        }
    }
}

/// `GET /health` — liveness check. Always `200 OK` while serving.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `GET /echo` — reflect query parameters, headers and peer address as JSON.
///
/// Output is indented when the `pretty` parameter is present.
pub async fn echo(
    Query(pairs): QueryPairs,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let pretty = pairs.iter().any(|(name, _)| name == "pretty");

    let mut parameters = MultiMap::new();
    for (name, value) in pairs {
        parameters.entry(name).or_default().push(value);
    }

    let body = EchoResponse {
        parameters,
        headers: HeaderSet::from_header_map(&headers).into_inner(),
        remote_addr: connect_info
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default(),
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&body)
    } else {
        serde_json::to_string(&body)
    };
    match rendered {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            error!(error = %e, "echo serialisation failed");
            error_response(&ServiceError::internal(
                "Internal Server Error. Marshalling failed.",
            ))
        }
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found")
}

/// Render `err` as a plain-text response with its mapped status code.
fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.message().to_owned()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    use crate::token::TokenBuilder;

    const PUBLIC_X509: &str = include_str!("../../tests/fixtures/rsa2048-public-x509.pem");

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/token", get(token))
            .route("/flow/redirect/token", get(redirect_token))
            .route("/echo", get(echo))
            .route("/health", get(health))
            .with_state(state)
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn token_returns_json() {
        let app = test_router(AppState::default());
        let resp = app
            .oneshot(get_request("/token", &[("authorization", "Bearer abc")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["secret"], "abc");
        assert_eq!(body["fingerprint"].as_str().unwrap().len(), 64);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn token_respects_header_order() {
        let state = AppState::new(TokenBuilder::new(vec!["Bar".into(), "Foo".into()], ""));
        let resp = test_router(state)
            .oneshot(get_request("/token", &[("foo", "f"), ("bar", "b")]))
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["secret"], "b");
    }

    #[tokio::test]
    async fn token_missing_returns_444() {
        let state = AppState::new(TokenBuilder::new(vec!["Foo".into(), "Bar".into()], ""));
        let resp = test_router(state)
            .oneshot(get_request("/token", &[("baz", "x")]))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 444);
        assert_eq!(body_text(resp).await, "Token not found. Looking for: Foo, Bar");
    }

    #[tokio::test]
    async fn token_uses_fallback() {
        let state = AppState::new(TokenBuilder::new(vec!["Foo".into()], "lol"));
        let resp = test_router(state)
            .oneshot(get_request("/token", &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains(r#""secret":"lol""#));
    }

    #[tokio::test]
    async fn redirect_missing_parameters_is_400() {
        let resp = test_router(AppState::default())
            .oneshot(get_request("/flow/redirect/token?state=s", &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(resp).await,
            "Bad Request. Missing query parameters: target, publicKeyType, publicKey"
        );
    }

    #[tokio::test]
    async fn redirect_success_is_301_to_target() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("target", "https://example.com/cb")
            .append_pair("state", "st")
            .append_pair("publicKeyType", "rsa2048-rfc5280-x509-pem")
            .append_pair("publicKey", PUBLIC_X509)
            .finish();
        let resp = test_router(AppState::default())
            .oneshot(get_request(
                &format!("/flow/redirect/token?{query}"),
                &[("authorization", "x")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://example.com/cb?key="));
        assert!(location.ends_with("&state=st"));
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let resp = test_router(AppState::default())
            .oneshot(get_request("/health", &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, r#"{"status":"OK."}"#);
    }

    #[tokio::test]
    async fn echo_reflects_request() {
        let resp = test_router(AppState::default())
            .oneshot(get_request("/echo?lol=lol", &[("x-tutu", "x")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        let body = body_text(resp).await;
        assert!(body.contains(r#""X-Tutu":["x"]"#), "{body}");
        assert!(body.contains(r#""lol":["lol"]"#), "{body}");
        assert!(body.contains(r#""remoteAddr":"""#), "{body}");
    }

    #[tokio::test]
    async fn echo_pretty_prints_on_request() {
        let resp = test_router(AppState::default())
            .oneshot(get_request("/echo?pretty", &[]))
            .await
            .unwrap();
        assert!(body_text(resp).await.contains("\n  \"parameters\""));
    }
}
