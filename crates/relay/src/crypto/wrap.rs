//! RSA-OAEP wrapping of the payload key under a recipient-supplied public key.
//!
//! Accepted inputs are PEM encoded RSA public keys in either of two forms:
//!
//! | PEM label        | Encoding                                  |
//! |------------------|-------------------------------------------|
//! | `PUBLIC KEY`     | X.509 SubjectPublicKeyInfo (RFC 5280)     |
//! | `RSA PUBLIC KEY` | PKCS#1 `RSAPublicKey` (RFC 8017)          |
//!
//! Only 2048-bit moduli are accepted. Other sizes are rejected even though
//! OAEP works with them.
//!
//! Checks run cheapest first and stop at the first failure:
//! PEM decode → block label → key parse → key type → key size → encrypt.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::ErrorKind;
use rsa::{
    pkcs1::{self, DecodeRsaPublicKey},
    pkcs8::{der::Decode, spki::SubjectPublicKeyInfoRef},
    rand_core::OsRng,
    traits::PublicKeyParts,
    Oaep, RsaPrivateKey, RsaPublicKey,
};
use sha2::Sha256;
use thiserror::Error;

/// Required RSA modulus size in bytes (2048 bits).
pub const REQUIRED_MODULUS_BYTES: usize = 256;

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_BOUNDARY_TAIL: &str = "-----";

/// Errors produced while wrapping a key. One variant per validation step.
#[derive(Debug, Error)]
pub enum WrapError {
    #[error("failed to decode PEM formatted block")]
    PemDecode,

    #[error("decoded PEM block not a public key")]
    NotPublicKey,

    /// Neither the SubjectPublicKeyInfo nor the PKCS#1 parser accepted the key.
    #[error("error parsing public key: {0}")]
    KeyParse(String),

    #[error("parsed key is not of type RSA")]
    NotRsaKey,

    /// Carries the modulus size in bytes of the rejected key.
    #[error("size of given key is forbidden: {0} bytes, only {REQUIRED_MODULUS_BYTES} bytes allowed")]
    ForbiddenKeySize(usize),

    #[error("error encrypting with RSA-OAEP: {0}")]
    Encryption(String),
}

impl WrapError {
    /// Malformed keys are the caller's fault; a failing encryption is ours.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WrapError::Encryption(_) => ErrorKind::Internal,
            _ => ErrorKind::BadRequest,
        }
    }

    /// Short stable name of the variant, used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            WrapError::PemDecode => "PemDecode",
            WrapError::NotPublicKey => "NotPublicKey",
            WrapError::KeyParse(_) => "KeyParse",
            WrapError::NotRsaKey => "NotRsaKey",
            WrapError::ForbiddenKeySize(_) => "ForbiddenKeySize",
            WrapError::Encryption(_) => "Encryption",
        }
    }
}

/// Encrypt `plaintext` with RSA-OAEP (SHA-256, MGF1-SHA-256, no label) under
/// the PEM encoded `public_key`.
///
/// # Errors
///
/// Returns the [`WrapError`] variant of the first validation step that fails.
pub fn encrypt(public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, WrapError> {
    let key = parse_public_key(public_key)?;

    let size = key.size();
    if size != REQUIRED_MODULUS_BYTES {
        return Err(WrapError::ForbiddenKeySize(size));
    }

    key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| WrapError::Encryption(e.to_string()))
}

/// Inverse of [`encrypt`] for the holder of the private key.
///
/// # Errors
///
/// Returns the underlying [`rsa::Error`] if the ciphertext does not decrypt.
pub fn decrypt(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, rsa::Error> {
    private_key.decrypt(Oaep::new::<Sha256>(), ciphertext)
}

/// Decode the PEM text and parse it into an RSA public key, without the
/// size policy.
fn parse_public_key(public_key: &[u8]) -> Result<RsaPublicKey, WrapError> {
    let (label, der) = decode_pem_block(public_key)?;
    if !label.contains("PUBLIC KEY") {
        return Err(WrapError::NotPublicKey);
    }

    match SubjectPublicKeyInfoRef::from_der(&der) {
        Ok(spki) => {
            if spki.algorithm.oid != pkcs1::ALGORITHM_OID {
                return Err(WrapError::NotRsaKey);
            }
            RsaPublicKey::try_from(spki).map_err(|e| WrapError::KeyParse(e.to_string()))
        }
        Err(_) => {
            RsaPublicKey::from_pkcs1_der(&der).map_err(|e| WrapError::KeyParse(e.to_string()))
        }
    }
}

/// Find the first well-formed PEM block in `input` and return its label and
/// DER body.
///
/// Text around the block is ignored, and so is a `BEGIN` line that has no
/// matching `END` line or an undecodable body; scanning resumes after it.
/// Body lines may have any width, including the whole body on one line.
fn decode_pem_block(input: &[u8]) -> Result<(String, Vec<u8>), WrapError> {
    let text = std::str::from_utf8(input).map_err(|_| WrapError::PemDecode)?;

    let mut rest = text;
    while let Some(start) = rest.find(PEM_BEGIN) {
        rest = &rest[start + PEM_BEGIN.len()..];
        if let Some(block) = decode_block_at(rest) {
            return Ok(block);
        }
    }
    Err(WrapError::PemDecode)
}

/// Decode the block whose `-----BEGIN ` marker ends right before `after_begin`.
fn decode_block_at(after_begin: &str) -> Option<(String, Vec<u8>)> {
    let label_len = after_begin.find(PEM_BOUNDARY_TAIL)?;
    let label = &after_begin[..label_len];
    if label.contains(|c: char| c == '\r' || c == '\n') {
        return None;
    }

    let body_and_rest = &after_begin[label_len + PEM_BOUNDARY_TAIL.len()..];
    let end_line = format!("-----END {label}-----");
    let body_len = body_and_rest.find(&end_line)?;

    let body: String = body_and_rest[..body_len].split_ascii_whitespace().collect();
    let der = STANDARD.decode(body).ok()?;
    Some((label.to_owned(), der))
}
