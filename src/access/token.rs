//! Signed, expiring session tokens.
//!
//! ## Format
//!
//! ```text
//! {issued_at}.{expires_at}.{nonce}.{mac}
//! ```
//!
//! Timestamps are unix seconds, `nonce` is a random UUID in simple form and
//! `mac` is `HMAC-SHA256(secret, canonical_fields)[..16]` in hex. The login is
//! part of the MAC input but not of the token, so changing the configured
//! login invalidates every outstanding session.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

/// Bytes of the HMAC kept in the token.
const MAC_LEN: usize = 16;

/// HMAC-SHA256 over `data` keyed with `secret`, ready to finalize or verify.
pub(crate) fn keyed_mac(secret: &[u8], data: &[u8]) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(data);
    mac
}

/// Why a token was rejected. Never shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not in `issued.expires.nonce.mac` form.
    #[error("Malformed session token")]
    Malformed,
    /// MAC does not match.
    #[error("Session token signature mismatch")]
    BadSignature,
    /// Past its expiry time.
    #[error("Session token expired")]
    Expired,
}

/// Verified contents of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time (exclusive).
    pub expires_at: DateTime<Utc>,
}

/// Session token issued on successful login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Token version marker for canonical representation.
    const TOKEN_VERSION: &'static str = "session_token_v1_hmac";

    /// Build the canonical string for HMAC computation.
    fn canonical_string(login: &str, issued_at: i64, expires_at: i64, nonce: &str) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            login,
            issued_at,
            expires_at,
            nonce,
            Self::TOKEN_VERSION,
        )
    }

    fn mac(secret: &[u8], canonical: &str) -> Hmac<Sha256> {
        keyed_mac(secret, canonical.as_bytes())
    }

    /// Issue a signed token valid for `ttl` from `issued_at`.
    pub fn issue_hmac(secret: &[u8], login: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let issued = issued_at.timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = issued.saturating_add(ttl_secs);
        let nonce = Uuid::new_v4().simple().to_string();

        let canonical = Self::canonical_string(login, issued, expires, &nonce);
        let result = Self::mac(secret, &canonical).finalize().into_bytes();

        Self(format!(
            "{}.{}.{}.{}",
            issued,
            expires,
            nonce,
            hex::encode(&result[..MAC_LEN])
        ))
    }

    /// Verify this token was issued with `secret` for `login` and is unexpired at `now`.
    ///
    /// The MAC is compared in constant time.
    pub fn verify_hmac(
        &self,
        secret: &[u8],
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, TokenError> {
        let mut parts = self.0.split('.');
        let (Some(issued), Some(expires), Some(nonce), Some(mac_hex), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let issued: i64 = issued.parse().map_err(|_| TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        if nonce.is_empty() || !nonce.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TokenError::Malformed);
        }
        let mac_bytes = hex::decode(mac_hex).map_err(|_| TokenError::Malformed)?;
        if mac_bytes.len() != MAC_LEN {
            return Err(TokenError::Malformed);
        }

        let canonical = Self::canonical_string(login, issued, expires, nonce);
        Self::mac(secret, &canonical)
            .verify_truncated_left(&mac_bytes)
            .map_err(|_| TokenError::BadSignature)?;

        let (Some(issued_at), Some(expires_at)) = (
            DateTime::<Utc>::from_timestamp(issued, 0),
            DateTime::<Utc>::from_timestamp(expires, 0),
        ) else {
            return Err(TokenError::Malformed);
        };

        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        Ok(SessionClaims {
            issued_at,
            expires_at,
        })
    }

    /// Get the token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a token from a client-presented string (for verification).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
