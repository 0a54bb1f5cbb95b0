use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::BlogKey;

/// Staleness gate - lets a caller skip blogs refreshed within a TTL window.
/// Implementations live in infrastructure (in-memory map, Redis).
#[async_trait]
pub trait SyncGate: Send + Sync {
    /// True when the blog was synced recently enough to skip this pass.
    async fn is_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> bool;

    /// Record a successful sync at `now`.
    async fn on_updated(&self, now: DateTime<Utc>, blog_key: &BlogKey) -> Result<(), GateError>;
}

/// Sync gate errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
