//! [`RelayEnvelope`]: the encrypted token as it travels in a redirect URL.
//!
//! ```text
//! <target>?key=<b64(rsa-oaep(aes key))>&nonce=<b64(nonce)>&payload=<b64(aes-gcm(token json))>&state=<state>
//! ```
//!
//! All three binary fields use standard, padded base64. `state` is passed
//! through untouched.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::RsaPrivateKey;
use thiserror::Error;
use url::Url;

use crate::crypto::{cipher, wrap, CipherError, NONCE_LEN};
use crate::token::Token;

pub const KEY_PARAM: &str = "key";
pub const NONCE_PARAM: &str = "nonce";
pub const PAYLOAD_PARAM: &str = "payload";
pub const STATE_PARAM: &str = "state";

/// Errors produced when reading or opening an envelope on the recipient side.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("query parameter {param} is not valid base64: {source}")]
    Base64 {
        param: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("nonce must be {NONCE_LEN} bytes, not {0} bytes")]
    NonceSize(usize),

    #[error("failed to unwrap payload key: {0}")]
    Unwrap(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("payload is not a token: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payload ciphertext, wrapped payload key and nonce for one relayed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEnvelope {
    /// AES-256-GCM ciphertext (with tag) of the token JSON.
    pub payload: Vec<u8>,
    /// RSA-OAEP ciphertext of the AES key.
    pub key: Vec<u8>,
    /// AES-GCM nonce. Not secret.
    pub nonce: [u8; NONCE_LEN],
}

impl RelayEnvelope {
    /// Append the envelope and `state` to the query of `url`, keeping any
    /// query parameters already present.
    pub fn append_to(&self, url: &mut Url, state: &str) {
        url.query_pairs_mut()
            .append_pair(KEY_PARAM, &STANDARD.encode(&self.key))
            .append_pair(NONCE_PARAM, &STANDARD.encode(self.nonce))
            .append_pair(PAYLOAD_PARAM, &STANDARD.encode(&self.payload))
            .append_pair(STATE_PARAM, state);
    }

    /// Read an envelope and its `state` back out of a redirect URL.
    ///
    /// When a parameter occurs more than once the last occurrence wins, since
    /// [`append_to`](Self::append_to) appends after the target's own query.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if a parameter is missing or malformed.
    pub fn from_url(url: &Url) -> Result<(Self, String), EnvelopeError> {
        let param = |name: &'static str| {
            url.query_pairs()
                .filter(|(k, _)| k == name)
                .last()
                .map(|(_, v)| v.into_owned())
                .ok_or(EnvelopeError::MissingParameter(name))
        };
        let decode = |name: &'static str| -> Result<Vec<u8>, EnvelopeError> {
            STANDARD
                .decode(param(name)?)
                .map_err(|source| EnvelopeError::Base64 {
                    param: name,
                    source,
                })
        };

        let nonce_bytes = decode(NONCE_PARAM)?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| EnvelopeError::NonceSize(nonce_bytes.len()))?;

        let envelope = Self {
            payload: decode(PAYLOAD_PARAM)?,
            key: decode(KEY_PARAM)?,
            nonce,
        };
        Ok((envelope, param(STATE_PARAM)?))
    }

    /// Unwrap the payload key with `private_key` and decrypt the token.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if the key does not unwrap, the payload does
    /// not authenticate, or the plaintext is not token JSON.
    pub fn open(&self, private_key: &RsaPrivateKey) -> Result<Token, EnvelopeError> {
        let key = wrap::decrypt(private_key, &self.key)
            .map_err(|e| EnvelopeError::Unwrap(e.to_string()))?;
        let plaintext = cipher::decrypt(&key, &self.nonce, &self.payload)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
