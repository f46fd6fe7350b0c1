//! Access gate for mutating operations.
//!
//! ```text
//!              authenticate(login, password) ok
//! Anonymous ─────────────────────────────────────▶ token issued
//!     ▲                                                 │
//!     │ token missing / bad MAC / expired               │ presented on each
//!     └──────────────── evaluate(token) ◀──────────────┘ mutation request
//!                            │ valid
//!                            ▼
//!                      Authenticated (this request only)
//! ```
//!
//! Reads never consult the gate. Verified tokens are cached in an LRU so
//! repeated requests skip the HMAC; expiry is still checked on every hit.

use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::Mac;
use lru::LruCache;
use parking_lot::RwLock;
use xxhash_rust::xxh64::Xxh64;

use super::token::{keyed_mac, SessionToken, TokenError};
use crate::config::BlogConfig;
use crate::error::BlogError;

/// Per-request access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// No valid session.
    Anonymous,
    /// Valid, unexpired session token presented.
    Authenticated,
}

impl AccessState {
    /// Whether the request is authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Fail with `Unauthorized` unless authenticated.
    pub fn require(self) -> Result<(), BlogError> {
        match self {
            Self::Authenticated => Ok(()),
            Self::Anonymous => Err(BlogError::Unauthorized),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}

/// Cached verification outcome: `Some(expiry)` for a good signature.
type CachedVerdict = Option<DateTime<Utc>>;

/// Cache key over everything that affects token validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VerificationCacheKey(u64);

impl VerificationCacheKey {
    fn compute(login: &str, token: &str) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.write(login.as_bytes());
        hasher.write(&[0]);
        hasher.write(token.as_bytes());
        Self(hasher.finish())
    }
}

/// Validates credentials, issues session tokens and evaluates presented ones.
pub struct AccessGate {
    login: String,
    password: String,
    secret: Vec<u8>,
    ttl: Duration,
    cache: Option<RwLock<LruCache<VerificationCacheKey, CachedVerdict>>>,
}

impl AccessGate {
    /// Create a gate without a verification cache.
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            secret: secret.into(),
            ttl,
            cache: None,
        }
    }

    /// Create a gate from startup configuration.
    pub fn from_config(config: &BlogConfig) -> Self {
        Self::new(
            config.login.clone(),
            config.password.clone(),
            config.secret_key.clone(),
            config.token_ttl,
        )
        .with_cache(config.token_cache_entries)
    }

    /// Enable an LRU verification cache. A capacity of 0 disables it.
    pub fn with_cache(mut self, max_entries: usize) -> Self {
        self.cache = NonZeroUsize::new(max_entries).map(|cap| RwLock::new(LruCache::new(cap)));
        self
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check credentials and issue a fresh token.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<SessionToken, BlogError> {
        self.authenticate_at(login, password, Utc::now())
    }

    /// [`authenticate`](Self::authenticate) with an explicit clock.
    pub fn authenticate_at(
        &self,
        login: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, BlogError> {
        // Evaluate both comparisons so timing does not reveal which one failed.
        let login_ok = self.credential_matches(login, &self.login);
        let password_ok = self.credential_matches(password, &self.password);

        if !(login_ok & password_ok) {
            tracing::warn!("Login rejected");
            return Err(BlogError::Unauthorized);
        }

        tracing::info!(ttl_secs = self.ttl.as_secs(), "Login accepted, session issued");
        Ok(SessionToken::issue_hmac(&self.secret, &self.login, now, self.ttl))
    }

    /// Evaluate a client-presented token for the current request.
    pub fn evaluate(&self, presented: Option<&str>) -> AccessState {
        self.evaluate_at(presented, Utc::now())
    }

    /// [`evaluate`](Self::evaluate) with an explicit clock.
    pub fn evaluate_at(&self, presented: Option<&str>, now: DateTime<Utc>) -> AccessState {
        let Some(raw) = presented.filter(|s| !s.is_empty()) else {
            return AccessState::Anonymous;
        };

        let key = VerificationCacheKey::compute(&self.login, raw);
        let expires_at = match self.cached_verdict(&key) {
            Some(verdict) => verdict,
            None => self.verify_and_cache(key, raw, now),
        };

        match expires_at {
            Some(expires_at) if now < expires_at => AccessState::Authenticated,
            _ => AccessState::Anonymous,
        }
    }

    /// Compare MACs of both values; `verify_slice` checks in constant time and
    /// the fixed-width tags hide the length of the configured value.
    fn credential_matches(&self, presented: &str, expected: &str) -> bool {
        let expected_tag = keyed_mac(&self.secret, expected.as_bytes())
            .finalize()
            .into_bytes();
        keyed_mac(&self.secret, presented.as_bytes())
            .verify_slice(&expected_tag)
            .is_ok()
    }

    fn cached_verdict(&self, key: &VerificationCacheKey) -> Option<CachedVerdict> {
        self.cache.as_ref()?.read().peek(key).copied()
    }

    fn verify_and_cache(
        &self,
        key: VerificationCacheKey,
        raw: &str,
        now: DateTime<Utc>,
    ) -> CachedVerdict {
        let token = SessionToken::from_string(raw.to_string());
        let verdict = match token.verify_hmac(&self.secret, &self.login, now) {
            Ok(claims) => Some(claims.expires_at),
            Err(TokenError::Expired) => {
                tracing::debug!("Expired session token presented");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                None
            }
        };

        if let Some(cache) = &self.cache {
            cache.write().put(key, verdict);
        }
        verdict
    }

    /// Get cache statistics.
    ///
    /// Returns `None` if caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
            }
        })
    }
}
