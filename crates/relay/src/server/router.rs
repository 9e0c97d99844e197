//! Axum router construction.

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Only the service routes carry the no-cache headers; the 404 fallback does
/// not.
pub fn build(state: AppState) -> Router {
    let routes = Router::new()
        .route("/token", get(handlers::token))
        .route("/flow/redirect/token", get(handlers::redirect_token))
        .route("/echo", get(handlers::echo))
        .route("/health", get(handlers::health))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(middleware::NO_CACHE_CONTROL),
        ))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static(middleware::NO_CACHE_PRAGMA),
        ))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static(middleware::NO_CACHE_EXPIRES),
        ));

    Router::new()
        .merge(routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
