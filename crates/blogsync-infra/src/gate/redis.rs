//! Redis sync gate - a staleness window shared by every worker process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use blogsync_core::domain::BlogKey;
use blogsync_core::ports::{GateError, SyncGate};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Prefix for gate keys
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "blogsync:gate".to_string(),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            key_prefix: std::env::var("REDIS_GATE_PREFIX")
                .unwrap_or_else(|_| "blogsync:gate".to_string()),
        }
    }
}

/// Redis-backed sync gate.
///
/// Each successful sync writes the sync time under `{prefix}:{blog_key}`
/// with the gate TTL as expiry. Redis failures read as "not fresh", so an
/// unreachable Redis costs an extra sync rather than a missed one.
pub struct RedisSyncGate {
    conn: ConnectionManager,
    config: RedisConfig,
    ttl: chrono::Duration,
}

impl RedisSyncGate {
    pub async fn new(config: RedisConfig, ttl: chrono::Duration) -> Result<Self, GateError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| GateError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| GateError::Connection("Connection timed out".to_string()))?
            .map_err(|e| GateError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis sync gate");

        Ok(Self { conn, config, ttl })
    }

    fn key(&self, blog_key: &BlogKey) -> String {
        format!("{}:{}", self.config.key_prefix, blog_key)
    }
}

#[async_trait]
impl SyncGate for RedisSyncGate {
    async fn is_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> bool {
        let key = self.key(blog_key);
        let mut conn = self.conn.clone();
        let stored = match conn.get::<_, Option<String>>(&key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                return false;
            }
        };
        stored
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .is_some_and(|last| now - last.with_timezone(&Utc) < self.ttl)
    }

    async fn on_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> Result<(), GateError> {
        let seconds = self.ttl.num_seconds().max(1) as u64;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(blog_key), now.to_rfc3339(), seconds)
            .await
            .map_err(|e| GateError::Operation(e.to_string()))?;
        Ok(())
    }
}
