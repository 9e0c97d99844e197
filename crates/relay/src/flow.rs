//! The token redirect flow: hand a request's token to a third party through
//! an untrusted browser redirect.
//!
//! Steps, terminal on first failure:
//!
//! 1. Require `target`, `state`, `publicKeyType` and `publicKey`.
//! 2. Check `publicKeyType` against the allow-list.
//! 3. Parse `target` as an absolute URL.
//! 4. Generate a fresh AES-256 payload key.
//! 5. Wrap the payload key under `publicKey` with RSA-OAEP.
//! 6. Extract the token from the request headers.
//! 7. Serialise the token to JSON.
//! 8. Encrypt the JSON under the payload key with AES-256-GCM.
//! 9. Append `key`, `nonce`, `payload` and `state` to `target`.
//!
//! All input validation happens before any key material is produced.

use std::str::FromStr;

use common::{ErrorKind, ServiceError};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::crypto::wrap::WrapError;
use crate::crypto::{
    cipher, wrap, CipherError, EntropySource, OsEntropy, PayloadKey, RandomSourceError,
};
use crate::envelope::RelayEnvelope;
use crate::token::{HeaderSet, TokenBuilder};

pub const TARGET_PARAM: &str = "target";
pub const STATE_PARAM: &str = "state";
pub const PUBLIC_KEY_TYPE_PARAM: &str = "publicKeyType";
pub const PUBLIC_KEY_PARAM: &str = "publicKey";

// ---------------------------------------------------------------------------
// Public key type
// ---------------------------------------------------------------------------

/// Declared format of the caller's public key.
///
/// Only a hint: the key itself is auto-detected from its PEM label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyType {
    /// 2048-bit RSA, X.509 SubjectPublicKeyInfo (RFC 5280), PEM.
    Rsa2048X509Pem,
    /// 2048-bit RSA, PKCS#1 (RFC 8017), PEM.
    Rsa2048Pkcs1Pem,
}

impl PublicKeyType {
    pub const ALL: [PublicKeyType; 2] = [
        PublicKeyType::Rsa2048X509Pem,
        PublicKeyType::Rsa2048Pkcs1Pem,
    ];

    /// Wire label accepted in the `publicKeyType` query parameter.
    pub fn label(self) -> &'static str {
        match self {
            PublicKeyType::Rsa2048X509Pem => "rsa2048-rfc5280-x509-pem",
            PublicKeyType::Rsa2048Pkcs1Pem => "rsa2048-rfc8017-pksc1-pem",
        }
    }
}

impl FromStr for PublicKeyType {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| FlowError::ForbiddenPublicKeyType(s.to_owned()))
    }
}

fn allowed_key_types() -> String {
    PublicKeyType::ALL.map(PublicKeyType::label).join(",")
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every way the redirect flow can fail. Display output is the plain-text
/// diagnostic returned to the caller.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Bad Request. Missing query parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("Bad Request. Value of query parameter {PUBLIC_KEY_TYPE_PARAM} forbidden. Allowed: {}", allowed_key_types())]
    ForbiddenPublicKeyType(String),

    #[error("Bad Request. Value of query parameter {TARGET_PARAM} is not an absolute URL: {0}")]
    InvalidTarget(#[source] url::ParseError),

    #[error("Internal Server Error. Secure random number generator failure.")]
    Random(#[source] RandomSourceError),

    #[error("{}", wrap_diagnostic(.0))]
    Wrap(#[source] WrapError),

    #[error("{}", token_not_found_message(.0))]
    TokenNotFound(Vec<String>),

    #[error("Internal Server Error. Marshalling failed.")]
    Serialize(#[source] serde_json::Error),

    #[error("Internal Server Error. Payload encryption failed.")]
    Encrypt(#[source] CipherError),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::MissingParameters(_)
            | FlowError::ForbiddenPublicKeyType(_)
            | FlowError::InvalidTarget(_) => ErrorKind::BadRequest,
            FlowError::Wrap(e) => e.kind(),
            FlowError::TokenNotFound(_) => ErrorKind::TokenNotFound,
            FlowError::Random(_) | FlowError::Serialize(_) | FlowError::Encrypt(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<FlowError> for ServiceError {
    fn from(e: FlowError) -> Self {
        ServiceError::new(e.kind(), e.to_string())
    }
}

/// Message for a request that carried no token. Shared with `GET /token`.
pub fn token_not_found_message<S: AsRef<str>>(searched: &[S]) -> String {
    let names: Vec<&str> = searched.iter().map(AsRef::as_ref).collect();
    format!("Token not found. Looking for: {}", names.join(", "))
}

fn wrap_diagnostic(e: &WrapError) -> String {
    match e.kind() {
        ErrorKind::Internal => format!("Internal Server Error. {}: {e}", e.label()),
        _ => format!("Bad Request. {}: {e}", e.label()),
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Raw query parameters of a redirect flow request. Absent parameters are
/// `None`; a present but empty parameter is `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectQuery {
    pub target: Option<String>,
    pub state: Option<String>,
    pub public_key_type: Option<String>,
    pub public_key: Option<String>,
}

impl RedirectQuery {
    /// Collect the flow parameters from decoded query pairs. The first
    /// occurrence of a repeated parameter wins; unknown parameters are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                TARGET_PARAM => &mut query.target,
                STATE_PARAM => &mut query.state,
                PUBLIC_KEY_TYPE_PARAM => &mut query.public_key_type,
                PUBLIC_KEY_PARAM => &mut query.public_key,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        query
    }

    /// Borrow all four parameters, or list the missing ones in request order.
    fn require(&self) -> Result<RedirectParams<'_>, FlowError> {
        match (
            self.target.as_deref(),
            self.state.as_deref(),
            self.public_key_type.as_deref(),
            self.public_key.as_deref(),
        ) {
            (Some(target), Some(state), Some(public_key_type), Some(public_key)) => {
                Ok(RedirectParams {
                    target,
                    state,
                    public_key_type,
                    public_key,
                })
            }
            _ => {
                let missing = [
                    (TARGET_PARAM, self.target.is_none()),
                    (STATE_PARAM, self.state.is_none()),
                    (PUBLIC_KEY_TYPE_PARAM, self.public_key_type.is_none()),
                    (PUBLIC_KEY_PARAM, self.public_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(FlowError::MissingParameters(missing))
            }
        }
    }
}

struct RedirectParams<'a> {
    target: &'a str,
    state: &'a str,
    public_key_type: &'a str,
    public_key: &'a str,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// Runs the redirect flow for one request at a time; holds no per-request state.
#[derive(Debug, Clone)]
pub struct RedirectFlow<E = OsEntropy> {
    tokens: TokenBuilder,
    entropy: E,
}

impl RedirectFlow<OsEntropy> {
    pub fn new(tokens: TokenBuilder) -> Self {
        Self::with_entropy(tokens, OsEntropy)
    }
}

impl<E: EntropySource> RedirectFlow<E> {
    /// Use `entropy` for the payload key and nonce instead of the OS RNG.
    pub fn with_entropy(tokens: TokenBuilder, entropy: E) -> Self {
        Self { tokens, entropy }
    }

    pub fn tokens(&self) -> &TokenBuilder {
        &self.tokens
    }

    /// Build the redirect URL carrying the encrypted token of `headers`.
    ///
    /// # Errors
    ///
    /// Returns the [`FlowError`] of the first step that fails.
    pub fn run(&self, query: &RedirectQuery, headers: &HeaderSet) -> Result<Url, FlowError> {
        let params = query.require()?;
        // Declared type is validated but not used for parsing.
        let _declared: PublicKeyType = params.public_key_type.parse()?;
        let mut target = Url::parse(params.target).map_err(FlowError::InvalidTarget)?;

        let payload_key = PayloadKey::generate(&self.entropy).map_err(FlowError::Random)?;
        let wrapped_key = wrap::encrypt(params.public_key.as_bytes(), payload_key.as_bytes())
            .map_err(FlowError::Wrap)?;

        let token = self
            .tokens
            .extract(headers)
            .map_err(|e| FlowError::TokenNotFound(e.searched().to_vec()))?;
        let payload = serde_json::to_vec(&token).map_err(FlowError::Serialize)?;
        let sealed = cipher::encrypt_with(&self.entropy, payload_key.as_bytes(), &payload)
            .map_err(FlowError::Encrypt)?;

        RelayEnvelope {
            payload: sealed.ciphertext,
            key: wrapped_key,
            nonce: sealed.nonce,
        }
        .append_to(&mut target, params.state);

        debug!(fingerprint = %token.fingerprint(), "token sealed for redirect");
        Ok(target)
    }
}
