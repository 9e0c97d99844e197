//! [`PayloadKey`]: the one-shot AES key that protects a single relayed token.

use super::cipher::KEY_LEN;
use super::random::{EntropySource, RandomSourceError};

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Generated fresh for every redirect and dropped when the response is built.
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
pub struct PayloadKey(Box<[u8; KEY_LEN]>);

impl PayloadKey {
    /// Draw a new key from `entropy`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomSourceError`] if the entropy source fails.
    pub fn generate<E>(entropy: &E) -> Result<Self, RandomSourceError>
    where
        E: EntropySource + ?Sized,
    {
        let mut buf = Box::new([0u8; KEY_LEN]);
        entropy.fill(&mut buf[..])?;
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for PayloadKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("PayloadKey([REDACTED])")
    }
}
