//! In-memory storage - the reference backend for both storage contracts.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use blogsync_core::domain::{
    ArchiveCount, ArchiveMonth, BlogKey, BlogMeta, BlogPost, BlogPostBase, BlogPostHeader, Page,
    Paging, SearchTerm, TagCount,
};
use blogsync_core::error::RepoError;
use blogsync_core::ports::{
    StorageQueryRepository, StorageSyncRepository, count_months, count_tags, listing_order,
};

use super::validate_update;

type PostMap = HashMap<BlogKey, BTreeMap<String, BlogPost>>;

/// Storage kept in two maps, each behind its own async `RwLock`.
///
/// Writers take `metas` before `posts`. `update` works on a staged copy of
/// the blog's posts and swaps it in only after every check has passed, so
/// readers see either the old or the new state of a blog.
/// Note: Data is lost on process restart.
pub struct InMemoryStorage {
    metas: RwLock<HashMap<BlogKey, BlogMeta>>,
    posts: RwLock<PostMap>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            metas: RwLock::new(HashMap::new()),
            posts: RwLock::new(HashMap::new()),
        }
    }

    /// Every stored post selected by `keys`, in listing order.
    async fn select(&self, keys: &[BlogKey], filter: impl Fn(&BlogPost) -> bool) -> Vec<BlogPost> {
        let posts = self.posts.read().await;
        let mut selected: Vec<BlogPost> = posts
            .iter()
            .filter(|(key, _)| BlogKey::any_matches(keys, key))
            .flat_map(|(_, blog)| blog.values())
            .filter(|post| filter(post))
            .cloned()
            .collect();
        selected.sort_by(listing_order);
        selected
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageSyncRepository for InMemoryStorage {
    async fn get_last_updated_at(
        &self,
        blog_key: &BlogKey,
    ) -> Result<Option<DateTime<Utc>>, RepoError> {
        let metas = self.metas.read().await;
        Ok(metas.get(blog_key).map(|meta| meta.updated_at))
    }

    async fn get_posts(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<BlogPostBase>, RepoError> {
        let posts = self.posts.read().await;
        let Some(blog) = posts.get(blog_key) else {
            return Ok(Vec::new());
        };
        Ok(blog
            .values()
            .filter(|post| after.is_none_or(|t| post.updated_at > t))
            .map(BlogPost::base)
            .collect())
    }

    async fn update(
        &self,
        blog_key: &BlogKey,
        meta: Option<BlogMeta>,
        inserted: Vec<BlogPost>,
        updated: Vec<BlogPost>,
        deleted: Vec<BlogPostBase>,
        prior_watermark: Option<DateTime<Utc>>,
    ) -> Result<(), RepoError> {
        validate_update(blog_key, meta.as_ref(), &inserted, &updated, &deleted)?;

        let mut metas = self.metas.write().await;
        let mut posts = self.posts.write().await;

        let mut staged = match prior_watermark {
            Some(_) => posts.get(blog_key).cloned().unwrap_or_default(),
            None => BTreeMap::new(),
        };
        for post in &deleted {
            staged.remove(&post.id);
        }
        for post in inserted.into_iter().chain(updated) {
            staged.insert(post.id.clone(), post);
        }

        let staged_meta = meta.map(|mut meta| {
            if let Some(current) = metas.get(blog_key) {
                meta.updated_at = meta.updated_at.max(current.updated_at);
            }
            meta
        });

        let count = staged.len();
        posts.insert(blog_key.clone(), staged);
        if let Some(meta) = staged_meta {
            metas.insert(blog_key.clone(), meta);
        }

        tracing::debug!(blog_key = %blog_key, posts = count, "Committed change set");
        Ok(())
    }
}

#[async_trait]
impl StorageQueryRepository for InMemoryStorage {
    async fn get_meta(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Option<BlogMeta>, RepoError> {
        let metas = self.metas.read().await;
        Ok(metas
            .get(blog_key)
            .filter(|meta| after.is_none_or(|t| meta.updated_at > t))
            .cloned())
    }

    async fn get_post(&self, id: &str, blog_key: &BlogKey) -> Result<Option<BlogPost>, RepoError> {
        if !blog_key.is_all() {
            let posts = self.posts.read().await;
            return Ok(posts.get(blog_key).and_then(|blog| blog.get(id)).cloned());
        }
        let found = self.select(&[], |post| post.id == id).await;
        Ok(found.into_iter().next())
    }

    async fn get_post_by_slug(
        &self,
        slug: &str,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogPost>, RepoError> {
        let found = self
            .select(std::slice::from_ref(blog_key), |post| post.slug == slug)
            .await;
        Ok(found.into_iter().next())
    }

    async fn list_post_headers(
        &self,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError> {
        let posts = self.select(keys, |_| true).await;
        Ok(paging.apply(posts).map(|post| post.header()))
    }

    async fn list_posts_by_archive(
        &self,
        month: ArchiveMonth,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError> {
        let posts = self
            .select(keys, |post| month.contains(&post.published_at))
            .await;
        Ok(paging.apply(posts))
    }

    async fn list_posts_by_tag(
        &self,
        tag: &str,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError> {
        let posts = self.select(keys, |post| post.has_tag(tag)).await;
        Ok(paging.apply(posts))
    }

    async fn search_post_headers(
        &self,
        term: &SearchTerm,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError> {
        let posts = self.select(keys, |post| term.matches_post(post)).await;
        Ok(paging.apply(posts).map(|post| post.header()))
    }

    async fn list_all_tags(&self, keys: &[BlogKey]) -> Result<Vec<TagCount>, RepoError> {
        let posts = self.posts.read().await;
        Ok(count_tags(
            posts
                .iter()
                .filter(|(key, _)| BlogKey::any_matches(keys, key))
                .flat_map(|(_, blog)| blog.values())
                .map(|post| post.tags.as_slice()),
        ))
    }

    async fn list_all_dates(&self, keys: &[BlogKey]) -> Result<Vec<ArchiveCount>, RepoError> {
        let posts = self.posts.read().await;
        Ok(count_months(
            posts
                .iter()
                .filter(|(key, _)| BlogKey::any_matches(keys, key))
                .flat_map(|(_, blog)| blog.values())
                .map(|post| &post.published_at),
        ))
    }
}
