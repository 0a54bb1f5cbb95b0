//! Content source port - abstraction over blog providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BlogKey, BlogMeta, BlogPost};
use crate::error::SourceError;

/// What a source returns for one blog.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub meta: Option<BlogMeta>,
    /// Posts changed after the requested watermark, or every post when no
    /// watermark was given.
    pub posts: Vec<BlogPost>,
    /// Every id the source currently publishes, when it can enumerate them
    /// cheaply. Enables deletion detection on incremental passes.
    pub live_ids: Option<Vec<String>>,
}

/// A provider of blog content (REST API, file tree, feed, ...).
#[async_trait]
pub trait BlogSource: Send + Sync {
    /// Fetch meta and posts updated after `updated_after`.
    ///
    /// With `updated_after == None` the returned posts must be the complete
    /// current set for the blog.
    async fn get_data(
        &self,
        blog_key: &BlogKey,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<SourceData, SourceError>;
}
