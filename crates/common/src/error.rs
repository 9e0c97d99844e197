//! Common error types shared across crates.

use thiserror::Error;

/// Non-standard status returned when no token could be found in a request.
pub const TOKEN_NOT_FOUND_STATUS: u16 = 444;

/// Coarse classification of a failure, used to pick the HTTP response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input supplied by the caller.
    BadRequest,
    /// No token header matched and no fallback token is configured.
    TokenNotFound,
    /// A cryptographic, entropy or serialisation failure on our side.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code that should be sent for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::TokenNotFound => TOKEN_NOT_FOUND_STATUS,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns `true` for failures the caller can fix by changing the request.
    pub fn is_client_fault(self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}

/// Top-level service error type.
///
/// Carries the [`ErrorKind`] together with a plain-text diagnostic that is
/// safe to return to the caller. It never contains token or key material.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
}

impl ServiceError {
    /// Construct a [`ServiceError`] of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`ErrorKind::BadRequest`] error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Shorthand for an [`ErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}
