//! AES-256-GCM encryption of the serialised token payload.
//!
//! Every call draws a fresh 96-bit nonce. Nonce uniqueness is only required
//! per key, and every redirect uses a freshly generated [`PayloadKey`], so a
//! random nonce is sufficient here.
//!
//! The authentication tag is appended to the ciphertext, as the `aes-gcm`
//! crate produces it.
//!
//! [`PayloadKey`]: super::PayloadKey

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

use super::random::{EntropySource, OsEntropy, RandomSourceError};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Output of [`encrypt`]: ciphertext (with tag) and the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
    /// Raw nonce bytes. Not secret.
    pub nonce: [u8; NONCE_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length. Carries the length that was supplied.
    #[error("key must be {KEY_LEN} bytes, not {0} bytes")]
    KeySize(usize),

    /// The nonce is the wrong length. Carries the length that was supplied.
    #[error("nonce must be {NONCE_LEN} bytes, not {0} bytes")]
    NonceSize(usize),

    /// No nonce could be generated.
    #[error(transparent)]
    Random(#[from] RandomSourceError),

    /// AES-GCM encryption or decryption failed.
    #[error("aead operation failed")]
    Aead,
}

/// Encrypt `plaintext` under `key` with AES-256-GCM and a fresh OS-random nonce.
///
/// # Errors
///
/// Returns [`CipherError::KeySize`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::Random`] if no nonce could be generated.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Sealed, CipherError> {
    encrypt_with(&OsEntropy, key, plaintext)
}

/// Same as [`encrypt`], drawing the nonce from `entropy`.
pub fn encrypt_with<E>(entropy: &E, key: &[u8], plaintext: &[u8]) -> Result<Sealed, CipherError>
where
    E: EntropySource + ?Sized,
{
    let cipher = build_cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    entropy.fill(&mut nonce)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::Aead)?;

    Ok(Sealed { ciphertext, nonce })
}

/// Decrypt ciphertext produced by [`encrypt`].
///
/// Only recipients and tests decrypt; the service itself never does.
///
/// # Errors
///
/// Returns [`CipherError::KeySize`] or [`CipherError::NonceSize`] on malformed
/// inputs and [`CipherError::Aead`] if authentication fails (wrong key or
/// tampered data).
pub fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::NonceSize(nonce.len()));
    }
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::Aead)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::KeySize(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::KeySize(key.len()))
}
