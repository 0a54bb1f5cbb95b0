//! In-memory sync gate - process-local staleness window per blog.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use blogsync_core::domain::BlogKey;
use blogsync_core::ports::{GateError, SyncGate};

/// Remembers when each blog last synced and reports it as fresh for `ttl`.
///
/// Note: Data is lost on process restart, so the first pass after a restart
/// syncs every blog.
pub struct InMemorySyncGate {
    ttl: Duration,
    synced_at: RwLock<HashMap<BlogKey, DateTime<Utc>>>,
}

impl InMemorySyncGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            synced_at: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SyncGate for InMemorySyncGate {
    async fn is_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> bool {
        let synced_at = self.synced_at.read().await;
        synced_at
            .get(blog_key)
            .is_some_and(|last| now - *last < self.ttl)
    }

    async fn on_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> Result<(), GateError> {
        let mut synced_at = self.synced_at.write().await;
        let entry = synced_at.entry(blog_key.clone()).or_insert(now);
        *entry = (*entry).max(now);
        Ok(())
    }
}
