//! Configuration loading and validation for the relay service.
//!
//! All values are read from `T2G_`-prefixed environment variables at startup.
//! Empty variables are treated as unset. The process exits with a clear error
//! message if a value is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix shared by every environment variable the service reads.
pub const ENV_PREFIX: &str = "T2G";

/// Validated relay service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Comma-separated header names searched for a token, in priority order.
    #[serde(default = "default_token_header_names")]
    pub token_header_names: String,

    /// Comma-separated header names searched after `token_header_names`.
    #[serde(default)]
    pub add_token_header_names: String,

    /// Token used when no header carries one. Empty disables the fallback.
    #[serde(default)]
    pub fallback_token: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Unset disables export.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_server_port() -> u16 {
    8080
}
fn default_token_header_names() -> String {
    [
        "Access-Token",
        "Authorization",
        "Token",
        "X-Auth-Request-Access-Token",
        "X-Forwarded-Access-Token",
    ]
    .join(",")
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        Self::from_source(environment())
    }

    /// Load and validate configuration from an explicit environment source.
    pub fn from_source(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Effective token header names: the primary list followed by the
    /// additional one.
    pub fn header_names(&self) -> Vec<String> {
        let mut names = split_to_list(&self.token_header_names);
        names.extend(split_to_list(&self.add_token_header_names));
        names
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            anyhow::bail!("{ENV_PREFIX}_SERVER_PORT must be > 0");
        }
        if self.header_names().is_empty() {
            anyhow::bail!(
                "{ENV_PREFIX}_TOKEN_HEADER_NAMES and {ENV_PREFIX}_ADD_TOKEN_HEADER_NAMES \
                 must name at least one header"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("token_header_names", &self.token_header_names)
            .field("add_token_header_names", &self.add_token_header_names)
            .field("fallback_token", &redacted(&self.fallback_token))
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).ignore_empty(true)
}

/// Split `s` on commas, trim every item and drop empty ones.
pub fn split_to_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
