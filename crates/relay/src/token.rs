//! Token extraction from request headers and the immutable [`Token`] record.
//!
//! # Extraction policy
//!
//! 1. Configured header names are tried in order; the first header that is
//!    present with a non-empty first value wins. Names match exactly
//!    (case-sensitive) against the canonical names in a [`HeaderSet`].
//! 2. A leading `Bearer ` is stripped from the chosen value.
//! 3. If that leaves nothing, a non-empty fallback token is used.
//! 4. An empty result is reported as [`TokenNotFound`], which still carries a
//!    [`Token`] with an empty secret.
//!
//! # Fingerprints
//!
//! The fingerprint is the lowercase hex SHA-512/256 digest of a fixed salt
//! followed by the secret. It is stable across requests, so repeated use of
//! one secret can be correlated in logs without storing the secret.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

/// Salt mixed into every fingerprint unless a builder overrides it.
pub const DEFAULT_FINGERPRINT_SALT: &str = "03c49494-c1f3-4b3c-a9e3-28b1c4e42177";

const BEARER_PREFIX: &str = "Bearer ";

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Salt prepended to a secret before hashing it into a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintSalt(String);

impl FingerprintSalt {
    pub fn new(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }

    /// Lowercase hex SHA-512/256 digest of salt ‖ `secret`.
    pub fn fingerprint(&self, secret: &str) -> String {
        let mut hasher = Sha512_256::new();
        hasher.update(self.0.as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for FingerprintSalt {
    fn default() -> Self {
        Self::new(DEFAULT_FINGERPRINT_SALT)
    }
}

/// An extracted secret with its creation time and fingerprint.
///
/// Serialises as `{"timestamp":…,"fingerprint":…,"secret":…}` in that order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    timestamp: String,
    fingerprint: String,
    secret: String,
}

impl Token {
    /// Build a token for `secret` stamped with the current time and the default salt.
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_salt(secret, &FingerprintSalt::default())
    }

    /// Build a token for `secret` stamped with the current time.
    pub fn with_salt(secret: impl Into<String>, salt: &FingerprintSalt) -> Self {
        Self::issued_at(secret, salt, Utc::now())
    }

    /// Build a token for `secret` stamped with `at`.
    pub fn issued_at(secret: impl Into<String>, salt: &FingerprintSalt, at: DateTime<Utc>) -> Self {
        let secret = secret.into();
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            fingerprint: salt.fingerprint(&secret),
            secret,
        }
    }

    /// RFC 3339 creation time, second precision, UTC.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("timestamp", &self.timestamp)
            .field("fingerprint", &self.fingerprint)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Header set
// ---------------------------------------------------------------------------

/// Request headers keyed by name, each with its values in arrival order.
///
/// Lookups are exact. When built from an [`HeaderMap`], names are stored in
/// canonical form (see [`canonical_header_key`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(BTreeMap<String, Vec<String>>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalise the names of an incoming request's headers.
    ///
    /// Values that are not valid UTF-8 are converted lossily.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut set = Self::new();
        for (name, value) in headers {
            set.append(
                canonical_header_key(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()),
            );
        }
        set
    }

    /// Append `value` to the values stored under exactly `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// Replace everything stored under `name`. An empty `values` leaves the
    /// name present with no values.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of `name` if present and non-empty.
    fn first_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.append(name, value);
        }
        set
    }
}

/// Canonical MIME form of a header name: the first letter and every letter
/// following a hyphen upper-cased, all others lower-cased.
///
/// `x-forwarded-access-token` becomes `X-Forwarded-Access-Token`.
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// No configured header carried a token and no fallback is configured.
#[derive(Debug, Error)]
#[error("failed to find token")]
pub struct TokenNotFound {
    token: Token,
    searched: Vec<String>,
}

impl TokenNotFound {
    /// The token built from the empty secret.
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn into_token(self) -> Token {
        self.token
    }

    /// Header names that were searched, in search order.
    pub fn searched(&self) -> &[String] {
        &self.searched
    }
}

/// Extraction policy: ordered header names, fallback token and salt.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct TokenBuilder {
    header_names: Vec<String>,
    fallback: String,
    salt: FingerprintSalt,
}

impl TokenBuilder {
    /// `fallback` is only used when non-empty.
    pub fn new(header_names: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            header_names,
            fallback: fallback.into(),
            salt: FingerprintSalt::default(),
        }
    }

    pub fn with_salt(mut self, salt: FingerprintSalt) -> Self {
        self.salt = salt;
        self
    }

    pub fn header_names(&self) -> &[String] {
        &self.header_names
    }

    pub fn has_fallback(&self) -> bool {
        !self.fallback.is_empty()
    }

    /// Extract a token from `headers` according to the policy.
    ///
    /// # Errors
    ///
    /// Returns [`TokenNotFound`] if the resulting secret is empty.
    pub fn extract(&self, headers: &HeaderSet) -> Result<Token, TokenNotFound> {
        let matched = self
            .header_names
            .iter()
            .find_map(|name| headers.first_non_empty(name))
            .unwrap_or_default();

        let mut secret = matched.strip_prefix(BEARER_PREFIX).unwrap_or(matched);
        if secret.is_empty() && !self.fallback.is_empty() {
            secret = self.fallback.as_str();
        }

        let token = Token::with_salt(secret, &self.salt);
        if secret.is_empty() {
            return Err(TokenNotFound {
                token,
                searched: self.header_names.clone(),
            });
        }
        Ok(token)
    }
}

impl std::fmt::Debug for TokenBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBuilder")
            .field("header_names", &self.header_names)
            .field("has_fallback", &self.has_fallback())
            .finish()
    }
}

/// One-off extraction with the default salt.
///
/// # Errors
///
/// Returns [`TokenNotFound`] if no header matched and `fallback` is empty.
pub fn extract_token<S: AsRef<str>>(
    headers: &HeaderSet,
    header_names: &[S],
    fallback: &str,
) -> Result<Token, TokenNotFound> {
    let names = header_names.iter().map(|n| n.as_ref().to_owned()).collect();
    TokenBuilder::new(names, fallback).extract(headers)
}
