//! Worker state - the wired sync service shared by every pass.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use blogsync_core::BlogKey;
use blogsync_core::ports::{StorageSyncRepository, SyncGate, TransformPipeline};
use blogsync_core::services::{SyncReport, SyncService};
use blogsync_core::transforms::{ImageUrlTransform, SummaryTransform};
use blogsync_infra::{InMemoryStorage, InMemorySyncGate, JsonDirectorySource};

#[cfg(feature = "postgres")]
use anyhow::Context;
#[cfg(feature = "postgres")]
use blogsync_infra::{DatabaseConfig, DatabaseConnections, PostgresBlogStorage};

#[cfg(feature = "redis")]
use blogsync_infra::{RedisConfig, RedisSyncGate};

use crate::config::AppConfig;

/// Shared worker state.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
    pub blog_keys: Arc<[BlogKey]>,
    /// Held for the duration of a pass so scheduled passes never overlap.
    pass_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Build the state with the backends the configuration selects.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = build_storage(config).await?;
        let source = Arc::new(JsonDirectorySource::new(&config.source_root));
        let transforms = TransformPipeline::new()
            .with(SummaryTransform::new(config.summary_max_chars))
            .with(ImageUrlTransform);

        tracing::info!(
            source_root = %config.source_root.display(),
            transforms = ?transforms.names(),
            concurrency = config.sync.concurrency,
            force_full = config.sync.force_full,
            "Sync service configured"
        );

        let mut sync = SyncService::new(source, storage, transforms, config.sync.clone());
        if let Some(gate) = build_gate(config).await {
            sync = sync.with_gate(gate);
        }

        Ok(Self {
            sync: Arc::new(sync),
            blog_keys: config.blog_keys.clone().into(),
            pass_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Sync every configured blog once. Returns `None` when another pass is
    /// still running.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Option<SyncReport> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            tracing::warn!("Previous sync pass still running, skipping this tick");
            return None;
        };

        let report = self.sync.sync_all(&self.blog_keys, cancel).await;
        match serde_json::to_string(&report) {
            Ok(json) => tracing::info!(report = %json, "Sync report"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize sync report"),
        }
        Some(report)
    }
}

#[cfg(feature = "postgres")]
async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn StorageSyncRepository>> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set. Running with in-memory storage.");
        return Ok(Arc::new(InMemoryStorage::new()));
    };

    let db_config = DatabaseConfig {
        url: url.clone(),
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
    };
    let connections = DatabaseConnections::init(&db_config)
        .await
        .context("Failed to connect to storage database")?;
    Ok(Arc::new(PostgresBlogStorage::new(connections.main)))
}

#[cfg(not(feature = "postgres"))]
async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn StorageSyncRepository>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without postgres feature");
    }
    tracing::info!("Running with in-memory storage");
    Ok(Arc::new(InMemoryStorage::new()))
}

async fn build_gate(config: &AppConfig) -> Option<Arc<dyn SyncGate>> {
    let ttl = config.gate_ttl?;

    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        let redis_config = RedisConfig {
            url: url.clone(),
            ..RedisConfig::from_env()
        };
        match RedisSyncGate::new(redis_config, ttl).await {
            Ok(gate) => return Some(Arc::new(gate)),
            Err(e) => {
                tracing::error!(error = %e, "Redis gate unavailable. Using in-memory fallback.");
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL ignored: built without redis feature");
    }

    tracing::info!(ttl_secs = ttl.num_seconds(), "Using in-memory sync gate");
    Some(Arc::new(InMemorySyncGate::new(ttl)))
}
