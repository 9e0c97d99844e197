//! Secure random byte generation.
//!
//! Callers take an [`EntropySource`] rather than reaching for the OS RNG
//! directly so tests can substitute fixed randomness or simulate failure.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use thiserror::Error;

/// The OS entropy source could not produce bytes.
///
/// Not transient: callers abort the operation instead of retrying.
#[derive(Debug, Error)]
#[error("secure random number generator failure: {0}")]
pub struct RandomSourceError(String);

impl RandomSourceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Source of cryptographically secure random bytes.
#[cfg_attr(test, mockall::automock)]
pub trait EntropySource {
    /// Fill `buf` entirely with fresh random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError>;
}

/// [`EntropySource`] backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| RandomSourceError::new(e.to_string()))
    }
}

/// Return `n` freshly generated random bytes from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`RandomSourceError`] if the OS entropy source is unavailable.
pub fn generate_random_bytes(n: usize) -> Result<Vec<u8>, RandomSourceError> {
    generate_with(&OsEntropy, n)
}

/// Return `n` random bytes drawn from `source`.
pub fn generate_with<E>(source: &E, n: usize) -> Result<Vec<u8>, RandomSourceError>
where
    E: EntropySource + ?Sized,
{
    let mut buf = vec![0u8; n];
    source.fill(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        for n in [0, 1, 12, 32, 1024] {
            assert_eq!(generate_random_bytes(n).unwrap().len(), n);
        }
    }

    #[test]
    fn consecutive_calls_differ() {
        let a = generate_random_bytes(32).unwrap();
        let b = generate_random_bytes(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn substituted_source_is_used() {
        let mut source = MockEntropySource::new();
        source.expect_fill().times(1).returning(|buf| {
            buf.fill(0xAB);
            Ok(())
        });
        assert_eq!(generate_with(&source, 4).unwrap(), vec![0xAB; 4]);
    }

    #[test]
    fn source_failure_propagates() {
        let mut source = MockEntropySource::new();
        source
            .expect_fill()
            .returning(|_| Err(RandomSourceError::new("entropy pool unavailable")));
        let err = generate_with(&source, 32).unwrap_err();
        assert!(err.to_string().contains("entropy pool unavailable"));
    }
}
