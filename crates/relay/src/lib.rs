//! `token-relay` — extract a request's authentication token and relay it to a
//! third party through a browser redirect, encrypted for that party only.
//!
//! The relayed token is protected with one-shot hybrid encryption: a fresh
//! AES-256-GCM key encrypts the token, RSA-OAEP wraps that key under the
//! recipient's public key, and both ciphertexts plus the nonce travel in the
//! redirect URL's query string. Nothing is stored between requests.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod flow;
pub mod server;
pub mod telemetry;
pub mod token;
