//! Middleware settings applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression and
//! cache suppression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `Cache-Control` sent with every response. Tokens, and redirects carrying
/// encrypted tokens, must never be cached by browsers or proxies.
pub const NO_CACHE_CONTROL: &str =
    "no-cache, no-store, no-transform, must-revalidate, private, max-age=0";

/// `Pragma` for HTTP/1.0 caches.
pub const NO_CACHE_PRAGMA: &str = "no-cache";

/// `Expires` in the past.
pub const NO_CACHE_EXPIRES: &str = "0";
