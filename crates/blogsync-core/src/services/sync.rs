//! Sync orchestrator - drives source fetch, diff, transforms and commit for
//! each blog key.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{BlogKey, BlogMeta, BlogPost, BlogPostBase};
use crate::error::{DomainError, RepoError, SyncError};
use crate::ports::{BlogSource, StorageSyncRepository, SyncGate, TransformPipeline};

use super::change_set::diff;

/// Sync orchestration settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of blogs synced at the same time.
    pub concurrency: usize,
    /// Ignore stored watermarks and the sync gate on every pass.
    pub force_full: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            force_full: false,
        }
    }
}

/// A post dropped from a change set because a storage transform failed.
#[derive(Debug, Clone, Serialize)]
pub struct TransformFailure {
    pub post_id: String,
    pub transform: String,
    pub message: String,
}

/// What one committed sync changed.
#[derive(Debug, Clone, Serialize)]
pub struct BlogSyncSummary {
    #[serde(skip)]
    pub blog_key: BlogKey,
    pub full_sync: bool,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub transform_failures: Vec<TransformFailure>,
}

/// Per-blog result of a multi-blog pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Synced(BlogSyncSummary),
    Skipped,
    Failed { error: String },
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogSyncOutcome {
    pub blog_key: BlogKey,
    #[serde(flatten)]
    pub status: SyncStatus,
}

/// Result of one multi-blog pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<BlogSyncOutcome>,
}

impl SyncReport {
    pub fn synced(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Synced(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Cancelled))
    }

    pub fn outcome(&self, blog_key: &BlogKey) -> Option<&SyncStatus> {
        self.outcomes
            .iter()
            .find(|o| &o.blog_key == blog_key)
            .map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&SyncStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Synchronizes blogs from a source into storage.
pub struct SyncService {
    source: Arc<dyn BlogSource>,
    storage: Arc<dyn StorageSyncRepository>,
    transforms: TransformPipeline,
    gate: Option<Arc<dyn SyncGate>>,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(
        source: Arc<dyn BlogSource>,
        storage: Arc<dyn StorageSyncRepository>,
        transforms: TransformPipeline,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            storage,
            transforms,
            gate: None,
            config,
        }
    }

    /// Skip blogs the gate reports as recently synced.
    pub fn with_gate(mut self, gate: Arc<dyn SyncGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync a single blog. Returns `None` when the gate skipped it.
    ///
    /// `force` ignores the stored watermark and the gate, turning the pass
    /// into a full replace of the blog's posts. Stored posts whose transforms
    /// fail during that pass keep their stored copy.
    #[tracing::instrument(skip(self, blog_key), fields(blog_key = %blog_key))]
    pub async fn sync_blog(
        &self,
        blog_key: &BlogKey,
        force: bool,
    ) -> Result<Option<BlogSyncSummary>, SyncError> {
        if blog_key.is_all() {
            return Err(SyncError::Domain {
                blog_key: blog_key.clone(),
                source: DomainError::Validation("Cannot sync the all-blogs key".to_string()),
            });
        }
        let force = force || self.config.force_full;

        if !force {
            if let Some(gate) = &self.gate {
                if gate.is_updated(Utc::now(), blog_key).await {
                    tracing::debug!("Blog synced recently, skipping");
                    return Ok(None);
                }
            }
        }

        let storage_err = |source: RepoError| SyncError::Storage {
            blog_key: blog_key.clone(),
            source,
        };

        let stored_watermark = self
            .storage
            .get_last_updated_at(blog_key)
            .await
            .map_err(storage_err)?;
        let watermark = if force { None } else { stored_watermark };
        let full_sync = watermark.is_none();

        let data = self
            .source
            .get_data(blog_key, watermark)
            .await
            .map_err(|source| SyncError::Source {
                blog_key: blog_key.clone(),
                source,
            })?;
        tracing::debug!(
            full_sync,
            fetched = data.posts.len(),
            enumerated = data.live_ids.is_some(),
            "Fetched blog from source"
        );

        // Proving deletions needs the whole stored set; otherwise the
        // incremental window is enough.
        let baseline_after = if full_sync || data.live_ids.is_some() {
            None
        } else {
            watermark
        };
        let stored = self
            .storage
            .get_posts(blog_key, baseline_after)
            .await
            .map_err(storage_err)?;

        let change_set = diff(
            blog_key,
            data.posts,
            &stored,
            watermark,
            data.live_ids.as_deref(),
        )
        .map_err(|source| SyncError::Domain {
            blog_key: blog_key.clone(),
            source,
        })?;

        let unchanged = change_set.unchanged.len();
        let mut failures = Vec::new();
        let inserted = self.apply_storage_transforms(change_set.inserted, &mut failures);
        let updated_count;
        let updated = if full_sync {
            // A full replace clears the blog first, so identical posts are
            // written back alongside the real updates.
            let mut changed = self.apply_storage_transforms(change_set.updated, &mut failures);
            updated_count = changed.len();
            changed.extend(self.apply_storage_transforms(change_set.unchanged, &mut failures));
            changed
        } else {
            let changed = self.apply_storage_transforms(change_set.updated, &mut failures);
            updated_count = changed.len();
            changed
        };
        let deleted = change_set.deleted;

        // A full replace would wipe the stored copy of a post whose transforms
        // just failed. Merge instead: the full-sync diff already lists every
        // deletion, so the result only differs in keeping those copies.
        let commit_after = if full_sync && failures_hit_stored(&failures, &stored) {
            tracing::warn!("Keeping stored copies of posts that failed to transform");
            stored_watermark.or_else(|| stored.iter().map(|p| p.updated_at).max())
        } else {
            watermark
        };

        let meta = hold_watermark(data.meta, watermark, !failures.is_empty());

        let summary = BlogSyncSummary {
            blog_key: blog_key.clone(),
            full_sync,
            inserted: inserted.len(),
            updated: updated_count,
            deleted: deleted.len(),
            unchanged,
            transform_failures: failures,
        };

        self.storage
            .update(blog_key, meta, inserted, updated, deleted, commit_after)
            .await
            .map_err(storage_err)?;

        tracing::info!(
            full_sync = summary.full_sync,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            failed = summary.transform_failures.len(),
            "Blog synced"
        );

        if let Some(gate) = &self.gate {
            if let Err(e) = gate.on_updated(Utc::now(), blog_key).await {
                tracing::warn!(error = %e, "Failed to record sync in gate");
            }
        }

        Ok(Some(summary))
    }

    /// Sync many blogs with bounded concurrency.
    ///
    /// A failing blog is reported and never stops the others. Blogs that have
    /// not started when `cancel` fires are reported as cancelled; a blog
    /// already committing runs to completion.
    pub async fn sync_all(&self, blog_keys: &[BlogKey], cancel: &CancellationToken) -> SyncReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let mut seen = HashSet::new();
        let keys: Vec<BlogKey> = blog_keys
            .iter()
            .filter(|k| seen.insert((*k).clone()))
            .cloned()
            .collect();

        tracing::info!(%run_id, blogs = keys.len(), "Starting sync pass");

        let outcomes: Vec<BlogSyncOutcome> = stream::iter(keys)
            .map(|blog_key| async move {
                if cancel.is_cancelled() {
                    return BlogSyncOutcome {
                        blog_key,
                        status: SyncStatus::Cancelled,
                    };
                }
                let status = match self.sync_blog(&blog_key, false).await {
                    Ok(Some(summary)) => SyncStatus::Synced(summary),
                    Ok(None) => SyncStatus::Skipped,
                    Err(e) => {
                        tracing::error!(blog_key = %blog_key, error = %e, "Blog sync failed");
                        SyncStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                BlogSyncOutcome { blog_key, status }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let report = SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        tracing::info!(
            %run_id,
            synced = report.synced(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            "Sync pass finished"
        );

        report
    }

    /// Run storage transforms, dropping posts whose chain fails.
    fn apply_storage_transforms(
        &self,
        posts: Vec<BlogPost>,
        failures: &mut Vec<TransformFailure>,
    ) -> Vec<BlogPost> {
        let mut kept = Vec::with_capacity(posts.len());
        for mut post in posts {
            match self.transforms.apply_post(&mut post) {
                Ok(()) => kept.push(post),
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "Dropping post from change set");
                    failures.push(TransformFailure {
                        post_id: e.post_id,
                        transform: e.transform,
                        message: e.message,
                    });
                }
            }
        }
        kept
    }
}

fn failures_hit_stored(failures: &[TransformFailure], stored: &[BlogPostBase]) -> bool {
    failures
        .iter()
        .any(|f| stored.iter().any(|p| p.id == f.post_id))
}

/// Keep the watermark where it was when posts were dropped, so the next pass
/// fetches the same window again.
fn hold_watermark(
    meta: Option<BlogMeta>,
    prior: Option<DateTime<Utc>>,
    dropped_posts: bool,
) -> Option<BlogMeta> {
    if !dropped_posts {
        return meta;
    }
    match prior {
        Some(prior) => meta.map(|mut meta| {
            meta.updated_at = meta.updated_at.min(prior);
            meta
        }),
        None => None,
    }
}
