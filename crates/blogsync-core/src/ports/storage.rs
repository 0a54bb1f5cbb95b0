use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ArchiveCount, ArchiveMonth, BlogKey, BlogMeta, BlogPost, BlogPostBase, BlogPostHeader, Page,
    Paging, SearchTerm, TagCount,
};
use crate::error::RepoError;

/// Sync-side storage: watermark reads, diff baselines and the atomic commit.
#[async_trait]
pub trait StorageSyncRepository: Send + Sync {
    /// The stored meta watermark for a blog, if any.
    async fn get_last_updated_at(
        &self,
        blog_key: &BlogKey,
    ) -> Result<Option<DateTime<Utc>>, RepoError>;

    /// Header shapes of stored posts. `None` returns every live post of the
    /// blog; `Some(t)` only posts with `updated_at > t`.
    async fn get_posts(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<BlogPostBase>, RepoError>;

    /// Commit one change set atomically.
    ///
    /// `prior_watermark == None` replaces the full post set of the blog:
    /// existing posts are cleared before `inserted`/`updated` are applied.
    /// `Some` merges: only `deleted` is removed, everything else is kept.
    /// Either every change lands or none does.
    async fn update(
        &self,
        blog_key: &BlogKey,
        meta: Option<BlogMeta>,
        inserted: Vec<BlogPost>,
        updated: Vec<BlogPost>,
        deleted: Vec<BlogPostBase>,
        prior_watermark: Option<DateTime<Utc>>,
    ) -> Result<(), RepoError>;
}

/// Query-side storage. Every `keys` filter treats an empty slice, or one
/// containing [`BlogKey::all`], as "every blog".
#[async_trait]
pub trait StorageQueryRepository: Send + Sync {
    /// Blog meta, only when it changed after `after` (always when `None`).
    async fn get_meta(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Option<BlogMeta>, RepoError>;

    /// Single post by id. With [`BlogKey::all`] every blog is searched and
    /// the first match in listing order wins.
    async fn get_post(&self, id: &str, blog_key: &BlogKey) -> Result<Option<BlogPost>, RepoError>;

    /// Single post by slug, resolved like [`Self::get_post`].
    async fn get_post_by_slug(
        &self,
        slug: &str,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogPost>, RepoError>;

    async fn list_post_headers(
        &self,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError>;

    async fn list_posts_by_archive(
        &self,
        month: ArchiveMonth,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError>;

    async fn list_posts_by_tag(
        &self,
        tag: &str,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError>;

    async fn search_post_headers(
        &self,
        term: &SearchTerm,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError>;

    async fn list_all_tags(&self, keys: &[BlogKey]) -> Result<Vec<TagCount>, RepoError>;

    async fn list_all_dates(&self, keys: &[BlogKey]) -> Result<Vec<ArchiveCount>, RepoError>;
}

/// Listing order shared by every backend: newest first, then id.
pub fn listing_order(a: &BlogPost, b: &BlogPost) -> std::cmp::Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Fold tag lists into counts, merging tags that differ only by case.
/// Sorted by count descending, then tag.
pub fn count_tags<'a>(tag_lists: impl IntoIterator<Item = &'a [String]>) -> Vec<TagCount> {
    let mut counts: std::collections::BTreeMap<String, TagCount> = Default::default();
    for tags in tag_lists {
        let mut seen = std::collections::HashSet::new();
        for tag in tags {
            let normalized = tag.trim().to_lowercase();
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                continue;
            }
            counts
                .entry(normalized)
                .or_insert_with(|| TagCount {
                    tag: tag.trim().to_string(),
                    count: 0,
                })
                .count += 1;
        }
    }
    let mut tags: Vec<TagCount> = counts.into_values().collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    tags
}

/// Fold publish dates into per-month counts, newest month first.
pub fn count_months<'a>(dates: impl IntoIterator<Item = &'a DateTime<Utc>>) -> Vec<ArchiveCount> {
    let mut counts: std::collections::BTreeMap<ArchiveMonth, usize> = Default::default();
    for date in dates {
        *counts.entry(ArchiveMonth::of(date)).or_default() += 1;
    }
    counts
        .into_iter()
        .rev()
        .map(|(month, count)| ArchiveCount { month, count })
        .collect()
}
