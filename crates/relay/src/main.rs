//! `token-relay` — binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline.
//! 3. Build the token extraction policy and application state.
//! 4. Build the Axum router and start the HTTP server.

use std::net::SocketAddr;

use anyhow::Result;
use tracing::{info, warn};

use relay::config::Config;
use relay::server::{self, state::AppState};
use relay::telemetry;
use relay::token::{canonical_header_key, TokenBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.server_port,
        "token-relay starting"
    );

    // -----------------------------------------------------------------------
    // 3. Token extraction policy
    // -----------------------------------------------------------------------
    let header_names = cfg.header_names();
    for name in &header_names {
        // Incoming names are canonicalised; anything else can never match.
        if *name != canonical_header_key(name) {
            warn!(
                header = %name,
                canonical = %canonical_header_key(name),
                "token header name is not canonical and will never match"
            );
        }
    }
    let tokens = TokenBuilder::new(header_names, cfg.fallback_token.clone());
    info!(
        header_names = ?tokens.header_names(),
        fallback = tokens.has_fallback(),
        "token extraction configured"
    );

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(tokens));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.server_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
