//! Telemetry setup: structured JSON logs, with optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No token secrets or key material** may appear in any span attribute or
//!   log field. Token fingerprints may be logged for correlation.
//! - Log level is configurable via `T2G_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;
