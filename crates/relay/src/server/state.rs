//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::flow::RedirectFlow;
use crate::token::TokenBuilder;

/// Application state shared across all request handlers.
///
/// Read-only after startup. The flow is `Arc`-wrapped so that Axum can clone
/// the state for each request without copying the header configuration.
#[derive(Clone, Debug)]
pub struct AppState {
    pub flow: Arc<RedirectFlow>,
}

impl AppState {
    /// Create a new [`AppState`] around the configured extraction policy.
    pub fn new(tokens: TokenBuilder) -> Self {
        Self {
            flow: Arc::new(RedirectFlow::new(tokens)),
        }
    }

    pub fn tokens(&self) -> &TokenBuilder {
        self.flow.tokens()
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] searching `Authorization` only, with no
    /// fallback, suitable for tests.
    fn default() -> Self {
        Self::new(TokenBuilder::new(vec!["Authorization".into()], ""))
    }
}
