//! End-to-end: JSON files -> SyncService -> InMemoryStorage -> QueryService.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blogsync_core::BlogKey;
use blogsync_core::domain::{BlogPost, BlogPostHeader};
use blogsync_core::error::TransformError;
use blogsync_core::ports::{
    StorageQueryRepository, StorageSyncRepository, Transform, TransformPipeline,
};
use blogsync_core::services::{QueryService, SyncConfig, SyncReport, SyncService, SyncStatus};
use blogsync_core::transforms::{HeaderLevelTransform, ImageUrlTransform, SummaryTransform};
use blogsync_infra::{InMemoryStorage, InMemorySyncGate, JsonDirectorySource};
use tokio_util::sync::CancellationToken;

struct ContentDir(PathBuf);

impl ContentDir {
    async fn new() -> Self {
        let root = std::env::temp_dir().join(format!("blogsync-it-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("travel/posts"))
            .await
            .unwrap();
        Self(root)
    }

    fn path(&self) -> &Path {
        &self.0
    }

    async fn write_meta(&self, updated_at: &str) {
        let meta = serde_json::json!({"name": "Travel Notes", "updated_at": updated_at});
        tokio::fs::write(self.0.join("travel/blog.json"), meta.to_string())
            .await
            .unwrap();
    }

    async fn write_post(&self, id: &str, published: &str, updated: &str, content: &str) {
        let post = serde_json::json!({
            "title": format!("Post {id}"),
            "tags": ["Travel"],
            "published_at": published,
            "updated_at": updated,
            "content": content,
        });
        tokio::fs::write(
            self.0.join(format!("travel/posts/{id}.json")),
            post.to_string(),
        )
        .await
        .unwrap();
    }

    async fn remove_post(&self, id: &str) {
        tokio::fs::remove_file(self.0.join(format!("travel/posts/{id}.json")))
            .await
            .unwrap();
    }
}

impl Drop for ContentDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn storage_transforms() -> TransformPipeline {
    TransformPipeline::new()
        .with(SummaryTransform::new(40))
        .with(ImageUrlTransform)
}

fn summary_counts(report: &SyncReport, key: &BlogKey) -> (usize, usize, usize) {
    match report.outcome(key) {
        Some(SyncStatus::Synced(summary)) => (summary.inserted, summary.updated, summary.deleted),
        other => panic!("expected a synced outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sync_then_query_roundtrip() {
    let content = ContentDir::new().await;
    content.write_meta("2024-01-02T00:00:00Z").await;
    content
        .write_post(
            "a",
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00Z",
            "<p>First day in Lisbon</p>",
        )
        .await;
    content
        .write_post(
            "b",
            "2024-01-02T00:00:00Z",
            "2024-01-02T00:00:00Z",
            "<h1>Porto</h1><p>Bridges <img src=\"/porto.jpg\"></p>",
        )
        .await;

    let key = BlogKey::new("Travel").unwrap();
    let storage = Arc::new(InMemoryStorage::new());
    let sync = SyncService::new(
        Arc::new(JsonDirectorySource::new(content.path())),
        storage.clone(),
        storage_transforms(),
        SyncConfig::default(),
    );
    let cancel = CancellationToken::new();

    // First pass: nothing stored, full sync.
    let report = sync.sync_all(&[key.clone()], &cancel).await;
    assert_eq!(summary_counts(&report, &key), (2, 0, 0));

    let stored = storage.get_post("b", &key).await.unwrap().unwrap();
    assert_eq!(stored.summary, "Porto Bridges");
    assert_eq!(stored.image_url.as_deref(), Some("/porto.jpg"));
    assert!(stored.content.starts_with("<h1>"));

    // Second pass: one edit, one delete, one new post.
    content.write_meta("2024-01-05T00:00:00Z").await;
    content.remove_post("a").await;
    content
        .write_post(
            "b",
            "2024-01-02T00:00:00Z",
            "2024-01-05T00:00:00Z",
            "<h1>Porto</h1><p>Bridges and wine</p>",
        )
        .await;
    content
        .write_post(
            "c",
            "2024-01-04T00:00:00Z",
            "2024-01-04T00:00:00Z",
            "<p>Coimbra</p>",
        )
        .await;

    let report = sync.sync_all(&[key.clone()], &cancel).await;
    assert_eq!(summary_counts(&report, &key), (1, 1, 1));

    // Third pass: source unchanged, nothing to do.
    let report = sync.sync_all(&[key.clone()], &cancel).await;
    assert_eq!(summary_counts(&report, &key), (0, 0, 0));

    let query = QueryService::new(
        storage.clone(),
        TransformPipeline::new().with(HeaderLevelTransform::new(1)),
    );

    let page = query.list_post_headers(&[], 0, 10).await.unwrap();
    let ids: Vec<&str> = page.items.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b"]);

    let post = query.get_post("b", &key).await.unwrap().unwrap();
    assert!(post.content.starts_with("<h2>Porto</h2>"));
    assert_eq!(post.summary, "Porto Bridges and wine");
    assert!(query.get_post("a", &key).await.unwrap().is_none());

    let tags = query.list_all_tags(&[key.clone()]).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].count, 2);

    let found = query.search_post_headers("coim", &[], 0, 10).await.unwrap();
    assert_eq!(found.total, 1);

    let meta = query.get_meta(&key, None).await.unwrap().unwrap();
    assert_eq!(meta.name, "Travel Notes");
}

#[tokio::test]
async fn test_gate_skips_recently_synced_blog() {
    let content = ContentDir::new().await;
    content.write_meta("2024-01-02T00:00:00Z").await;
    content
        .write_post(
            "a",
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00Z",
            "<p>Hello</p>",
        )
        .await;

    let key = BlogKey::new("travel").unwrap();
    let missing = BlogKey::new("missing").unwrap();
    let storage = Arc::new(InMemoryStorage::new());
    let sync = SyncService::new(
        Arc::new(JsonDirectorySource::new(content.path())),
        storage.clone(),
        storage_transforms(),
        SyncConfig::default(),
    )
    .with_gate(Arc::new(InMemorySyncGate::new(chrono::Duration::minutes(10))));
    let cancel = CancellationToken::new();

    let report = sync.sync_all(&[key.clone(), missing.clone()], &cancel).await;
    assert_eq!(report.synced(), 1);
    assert!(matches!(report.outcome(&missing), Some(SyncStatus::Failed { .. })));

    let report = sync.sync_all(&[key.clone()], &cancel).await;
    assert!(matches!(report.outcome(&key), Some(SyncStatus::Skipped)));

    // Forcing bypasses the gate and rewrites the blog from scratch.
    let summary = sync.sync_blog(&key, true).await.unwrap().unwrap();
    assert!(summary.full_sync);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(storage.get_posts(&key, None).await.unwrap().len(), 1);
}

/// Refuses post "b" while switched on.
struct Refuse(Arc<AtomicBool>);

impl Transform for Refuse {
    fn name(&self) -> &'static str {
        "refuse"
    }

    fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
        if post.id == "b" && self.0.load(Ordering::SeqCst) {
            return Err(TransformError::new(self.name(), &post.id, "refused"));
        }
        Ok(())
    }

    fn transform_header(&self, _header: &mut BlogPostHeader) -> Result<(), TransformError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_forced_sync_keeps_post_whose_transform_failed() {
    let content = ContentDir::new().await;
    content.write_meta("2024-01-02T00:00:00Z").await;
    for (id, day) in [("a", "01"), ("b", "02")] {
        let ts = format!("2024-01-{day}T00:00:00Z");
        content.write_post(id, &ts, &ts, "<p>Hello</p>").await;
    }

    let key = BlogKey::new("travel").unwrap();
    let refuse = Arc::new(AtomicBool::new(false));
    let storage = Arc::new(InMemoryStorage::new());
    let sync = SyncService::new(
        Arc::new(JsonDirectorySource::new(content.path())),
        storage.clone(),
        TransformPipeline::new().with(Refuse(refuse.clone())),
        SyncConfig::default(),
    );

    sync.sync_blog(&key, false).await.unwrap();
    assert!(storage.get_post("b", &key).await.unwrap().is_some());

    refuse.store(true, Ordering::SeqCst);
    let forced = sync.sync_blog(&key, true).await.unwrap().unwrap();
    assert_eq!(forced.transform_failures.len(), 1);
    assert!(storage.get_post("b", &key).await.unwrap().is_some());
    assert!(storage.get_post("a", &key).await.unwrap().is_some());

    refuse.store(false, Ordering::SeqCst);
    let next = sync.sync_blog(&key, false).await.unwrap().unwrap();
    assert_eq!(next.inserted, 0);
    assert!(storage.get_post("b", &key).await.unwrap().is_some());
    assert_eq!(
        storage.get_last_updated_at(&key).await.unwrap(),
        Some("2024-01-02T00:00:00Z".parse().unwrap())
    );
}
