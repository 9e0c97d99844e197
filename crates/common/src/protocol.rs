//! Response types for the operational endpoints.
//!
//! These types are serialised as JSON over the public HTTP API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status. Always `"OK."` while the process is serving.
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Echo
// ---------------------------------------------------------------------------

/// Multimap of names to values in arrival order.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// Response body for `GET /echo`: everything the service saw of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    /// Query parameters.
    pub parameters: MultiMap,
    /// Request headers keyed by canonical header name.
    pub headers: MultiMap,
    /// Peer address of the connection, empty if unknown.
    #[serde(rename = "remoteAddr")]
    pub remote_addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serde() {
        let json = serde_json::to_string(&HealthResponse::ok()).unwrap();
        assert_eq!(json, r#"{"status":"OK."}"#);
    }

    #[test]
    fn echo_response_uses_camel_case_remote_addr() {
        let mut headers = MultiMap::new();
        headers.insert("X-Tutu".into(), vec!["x".into()]);
        let echo = EchoResponse {
            parameters: MultiMap::new(),
            headers,
            remote_addr: "127.0.0.1:4000".into(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        assert!(json.contains(r#""X-Tutu":["x"]"#));
        assert!(json.contains(r#""remoteAddr":"127.0.0.1:4000""#));
    }
}
