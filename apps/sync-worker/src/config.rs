//! Worker configuration loaded from environment variables.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use blogsync_core::BlogKey;
use blogsync_core::services::SyncConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Blogs synced on every pass.
    pub blog_keys: Vec<BlogKey>,
    /// Root of the JSON directory source.
    pub source_root: PathBuf,
    /// Postgres storage when set, in-memory otherwise.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub sync: SyncConfig,
    /// Cron expression (with seconds). `None` runs a single pass and exits.
    pub schedule: Option<String>,
    /// Staleness window; `None` disables the gate.
    pub gate_ttl: Option<chrono::Duration>,
    /// Redis-backed gate when set, in-memory otherwise.
    pub redis_url: Option<String>,
    pub summary_max_chars: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let blog_keys =
            parse_blog_keys(&env::var("BLOG_KEYS").context("BLOG_KEYS must be set")?)?;

        let gate_ttl_secs: i64 = parse_or("SYNC_GATE_TTL_SECS", 0);

        Ok(Self {
            blog_keys,
            source_root: env::var("SOURCE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./content")),
            database_url: non_empty("DATABASE_URL"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            db_min_connections: parse_or("DB_MIN_CONNECTIONS", 1),
            sync: SyncConfig {
                concurrency: parse_or("SYNC_CONCURRENCY", 4usize).max(1),
                force_full: env::var("SYNC_FORCE_FULL")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            },
            schedule: non_empty("SYNC_SCHEDULE"),
            gate_ttl: (gate_ttl_secs > 0).then(|| chrono::Duration::seconds(gate_ttl_secs)),
            redis_url: non_empty("REDIS_URL"),
            summary_max_chars: parse_or("SUMMARY_MAX_CHARS", 300),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma-separated key list, dropping blanks and duplicates.
pub fn parse_blog_keys(raw: &str) -> anyhow::Result<Vec<BlogKey>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let key = BlogKey::new(part).with_context(|| format!("Invalid blog key '{part}'"))?;
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        bail!("BLOG_KEYS must name at least one blog");
    }
    Ok(keys)
}
