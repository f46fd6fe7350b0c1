//! PostgreSQL document store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection acquire timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! ## Id sequence
//!
//! The sequence lives in `item_sequence` and is advanced by one
//! `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement, which is atomic
//! across any number of processes sharing the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Row};
use std::time::Duration;

use super::DocumentStore;
use crate::ranking::{PageWindow, TagFilter};
use crate::types::{ContentItem, ItemId, RankedItem, TagSet};

/// Schema for content items and the id sequence.
pub const CONTENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content_items (
    id            BIGINT PRIMARY KEY,
    title         TEXT NOT NULL,
    body          TEXT NOT NULL,
    tags          TEXT[] NOT NULL DEFAULT '{}',
    published_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS content_items_tags_idx ON content_items USING GIN (tags);
CREATE INDEX IF NOT EXISTS content_items_published_idx ON content_items (published_at DESC, id DESC);
CREATE TABLE IF NOT EXISTS item_sequence (
    name   TEXT PRIMARY KEY,
    value  BIGINT NOT NULL
);
"#;

/// Sequence row owned by the allocator.
const SEQUENCE_NAME: &str = "content_items";

/// Candidate predicate shared by the count and the fetch. `$1` is the filter.
const MATCH_PREDICATE: &str = "cardinality($1::text[]) = 0 OR tags && $1::text[]";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Window does not fit in a Postgres BIGINT.
    #[error("Page window out of range")]
    WindowOutOfRange,
}

/// PostgreSQL document store.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        (&self.pool).execute(CONTENT_SCHEMA).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    fn parse_item_row(row: &PgRow) -> Result<ContentItem, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let tags: Vec<String> = row.try_get("tags")?;
        let published_at: DateTime<Utc> = row.try_get("published_at")?;

        Ok(ContentItem {
            id: ItemId::new(id),
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            tags: TagSet::from(tags),
            published_at,
        })
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    type Error = PostgresError;

    async fn count_matching(&self, filter: &TagFilter) -> Result<u64, Self::Error> {
        let sql = format!("SELECT COUNT(*) AS n FROM content_items WHERE {MATCH_PREDICATE}");
        let row = sqlx::query(&sql)
            .bind(filter.tags().as_slice())
            .fetch_one(&self.pool)
            .await?;

        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn fetch_ranked(
        &self,
        filter: &TagFilter,
        window: PageWindow,
    ) -> Result<Vec<RankedItem>, Self::Error> {
        let offset = i64::try_from(window.skip).map_err(|_| PostgresError::WindowOutOfRange)?;
        let limit = i64::try_from(window.limit).map_err(|_| PostgresError::WindowOutOfRange)?;

        let sql = format!(
            r#"
            SELECT id, title, body, tags, published_at,
                   (SELECT COUNT(*) FROM unnest(tags) AS t(tag) WHERE t.tag = ANY($1::text[])) AS commonality
            FROM content_items
            WHERE {MATCH_PREDICATE}
            ORDER BY commonality DESC, published_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.tags().as_slice())
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let commonality: i64 = row.try_get("commonality")?;
                Ok(RankedItem {
                    item: Self::parse_item_row(row)?,
                    commonality: commonality.max(0) as u64,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(PostgresError::from)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>, Self::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, title, body, tags, published_at
            FROM content_items
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(Self::parse_item_row(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            INSERT INTO content_items (id, title, body, tags, published_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id.get())
        .bind(&item.title)
        .bind(&item.body)
        .bind(item.tags.as_slice())
        .bind(item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_item(&self, item: &ContentItem) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            r#"
            UPDATE content_items
            SET title = $2, body = $3, tags = $4, published_at = $5
            WHERE id = $1
            "#,
        )
        .bind(item.id.get())
        .bind(&item.title)
        .bind(&item.body)
        .bind(item.tags.as_slice())
        .bind(item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, Self::Error> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn next_sequence(&self) -> Result<i64, Self::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO item_sequence (name, value)
            VALUES ($1, (SELECT COALESCE(MAX(id), 0) + 1 FROM content_items))
            ON CONFLICT (name) DO UPDATE SET value = item_sequence.value + 1
            RETURNING value
            "#,
        )
        .bind(SEQUENCE_NAME)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get::<i64, _>("value")?)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
