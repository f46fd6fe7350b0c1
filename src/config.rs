//! Startup configuration.
//!
//! Built once at process start and injected into the core; nothing reads
//! configuration after that.
//!
//! ## Sources
//!
//! An optional JSON file named by `BLOG_CONFIG` (keys in PascalCase, e.g.
//! `PageSize`, `Login`, `Password`, `SecretKey`, `BlogTitle`, `Host`) is read
//! first. Environment variables override it:
//!
//! - `BLOG_LOGIN`, `BLOG_PASSWORD`: admin credentials (required)
//! - `BLOG_SECRET_KEY`: session token signing secret
//! - `BLOG_PAGE_SIZE`: items per page (default: 8)
//! - `BLOG_TITLE`: blog title (default: "Blog")
//! - `BLOG_TOKEN_TTL_SECS`: session lifetime (default: 43200)
//! - `BLOG_TOKEN_CACHE_ENTRIES`: verification cache size (default: 1024, 0 disables)
//! - `HOST`, `PORT`: listen address (default: 0.0.0.0:8001)
//! - `REQUEST_TIMEOUT_SECS`: request deadline applied at the router edge (default: none)

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::types::PageSize;

const DEVELOPMENT_SECRET: &[u8] = b"development_only_secret_not_for_production";
const DEFAULT_PORT: u16 = 8001;

/// Configuration errors. Raised at startup only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Page size must be a positive integer.
    #[error("Invalid page size: {0} (must be positive)")]
    InvalidPageSize(i64),
    /// A required setting is absent.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    /// A setting could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid JSON.
    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shape of the optional JSON config file.
///
/// Unknown keys are ignored so older files keep loading.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileConfig {
    page_size: Option<i64>,
    host: Option<String>,
    login: Option<String>,
    password: Option<String>,
    secret_key: Option<String>,
    blog_title: Option<String>,
    token_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl FileConfig {
    fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Process-wide configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct BlogConfig {
    /// Blog title shown on listings.
    pub title: String,
    /// Admin login.
    pub login: String,
    /// Admin password.
    pub password: String,
    /// Session token signing secret.
    pub secret_key: Vec<u8>,
    /// Items per page.
    pub page_size: PageSize,
    /// Session token lifetime.
    pub token_ttl: Duration,
    /// Token verification cache capacity (0 disables caching).
    pub token_cache_entries: usize,
    /// Socket address to listen on.
    pub listen_addr: String,
    /// Optional per-request deadline enforced by the HTTP layer.
    pub request_timeout: Option<Duration>,
}

impl BlogConfig {
    /// Default session lifetime (12 hours).
    pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

    /// Create a configuration with defaults for everything but credentials.
    pub fn new(login: impl Into<String>, password: impl Into<String>, secret_key: impl Into<Vec<u8>>) -> Self {
        Self {
            title: "Blog".to_string(),
            login: login.into(),
            password: password.into(),
            secret_key: secret_key.into(),
            page_size: PageSize::DEFAULT,
            token_ttl: Self::DEFAULT_TOKEN_TTL,
            token_cache_entries: 1024,
            listen_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            request_timeout: None,
        }
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the blog title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the session token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup("BLOG_CONFIG") {
            Some(path) => {
                tracing::info!(path = %path, "Loading config file");
                FileConfig::read(path)?
            }
            None => FileConfig::default(),
        };

        let login = lookup("BLOG_LOGIN")
            .or(file.login)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("BLOG_LOGIN"))?;
        let password = lookup("BLOG_PASSWORD")
            .or(file.password)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("BLOG_PASSWORD"))?;

        let secret_key = match lookup("BLOG_SECRET_KEY").or(file.secret_key) {
            Some(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                tracing::warn!(
                    "BLOG_SECRET_KEY not set, using development secret. \
                     Set this for production!"
                );
                DEVELOPMENT_SECRET.to_vec()
            }
        };

        let page_size = match lookup("BLOG_PAGE_SIZE") {
            Some(raw) => parse_setting("BLOG_PAGE_SIZE", &raw)?,
            None => file.page_size.unwrap_or(PageSize::DEFAULT.into()),
        };

        let token_ttl_secs = match lookup("BLOG_TOKEN_TTL_SECS") {
            Some(raw) => parse_setting("BLOG_TOKEN_TTL_SECS", &raw)?,
            None => file
                .token_ttl_secs
                .unwrap_or(Self::DEFAULT_TOKEN_TTL.as_secs()),
        };
        if token_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "BLOG_TOKEN_TTL_SECS",
                value: "0".to_string(),
            });
        }

        let request_timeout_secs: Option<u64> = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(parse_setting("REQUEST_TIMEOUT_SECS", &raw)?),
            None => file.request_timeout_secs,
        };

        let mut config = Self::new(login, password, secret_key)
            .with_page_size(PageSize::new(page_size)?)
            .with_token_ttl(Duration::from_secs(token_ttl_secs));

        if let Some(title) = lookup("BLOG_TITLE").or(file.blog_title) {
            config.title = title;
        }
        if let Some(raw) = lookup("BLOG_TOKEN_CACHE_ENTRIES") {
            config.token_cache_entries = parse_setting("BLOG_TOKEN_CACHE_ENTRIES", &raw)?;
        }
        config.listen_addr = listen_addr(lookup("HOST"), lookup("PORT"), file.host)?;
        config.request_timeout = request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(config)
    }
}

fn parse_setting<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

/// Resolve the listen address.
///
/// `HOST`/`PORT` win over the file's `Host`; a file host of the form `:8080`
/// binds all interfaces.
fn listen_addr(
    host: Option<String>,
    port: Option<String>,
    file_host: Option<String>,
) -> Result<String, ConfigError> {
    if host.is_some() || port.is_some() {
        let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = match port {
            Some(raw) => parse_setting("PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        return Ok(format!("{host}:{port}"));
    }

    Ok(match file_host {
        Some(h) if h.starts_with(':') => format!("0.0.0.0{h}"),
        Some(h) => h,
        None => format!("0.0.0.0:{DEFAULT_PORT}"),
    })
}
