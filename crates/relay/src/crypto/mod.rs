//! Cryptographic primitives behind the redirect flow.
//!
//! This module is intentionally free of HTTP dependencies. Every operation is
//! per-request: keys and nonces are generated on demand and never cached.
//!
//! - [`random`]: OS-backed entropy behind the narrow [`EntropySource`] seam.
//! - [`key`]: the one-shot AES payload key, zeroed on drop.
//! - [`cipher`]: AES-256-GCM payload encryption.
//! - [`wrap`]: RSA-OAEP wrapping of the payload key under a caller-supplied
//!   public key, with the key validation policy.

pub mod cipher;
pub mod key;
pub mod random;
pub mod wrap;

pub use cipher::{CipherError, KEY_LEN, NONCE_LEN};
pub use key::PayloadKey;
pub use random::{EntropySource, OsEntropy, RandomSourceError};
