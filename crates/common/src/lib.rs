//! Common types, protocol definitions, and errors shared across `token-relay` crates.

pub mod error;
pub mod protocol;

pub use error::{ErrorKind, ServiceError};
