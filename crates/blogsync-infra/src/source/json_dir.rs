//! File-tree source: one directory per blog, one JSON file per post.
//!
//! ```text
//! <root>/<blog_key>/blog.json        blog meta (optional)
//! <root>/<blog_key>/posts/<id>.json  one post per file
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use blogsync_core::domain::{Author, BlogKey, BlogMeta, BlogPost};
use blogsync_core::error::SourceError;
use blogsync_core::ports::{BlogSource, SourceData};

#[derive(Debug, Deserialize)]
struct MetaFile {
    id: Option<String>,
    source_id: Option<String>,
    name: String,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PostFile {
    id: Option<String>,
    slug: Option<String>,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    published_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    author: Author,
    image_url: Option<String>,
    source_url: Option<String>,
    source_id: Option<String>,
}

impl PostFile {
    fn into_post(self, blog_key: &BlogKey, stem: &str) -> BlogPost {
        let id = self.id.unwrap_or_else(|| stem.to_string());
        BlogPost {
            blog_key: blog_key.clone(),
            slug: self.slug.unwrap_or_else(|| id.clone()),
            id,
            title: self.title,
            tags: self.tags,
            published_at: self.published_at,
            updated_at: self.updated_at.unwrap_or(self.published_at),
            content: self.content,
            summary: self.summary,
            hash: None,
            author: self.author,
            image_url: self.image_url,
            source_url: self.source_url,
            source_id: self.source_id,
        }
    }
}

/// Reads blogs from a directory tree of JSON files.
///
/// Every pass lists the whole `posts/` directory, so the returned data always
/// carries `live_ids` and deletions are detected on incremental passes too.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_meta(
        &self,
        dir: &Path,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogMeta>, SourceError> {
        let path = dir.join("blog.json");
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SourceError::Io(format!("{}: {e}", path.display()))),
        };
        let file: MetaFile = serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::Parse(format!("{}: {e}", path.display())))?;
        Ok(Some(BlogMeta {
            blog_key: blog_key.clone(),
            id: file.id.unwrap_or_else(|| blog_key.to_string()),
            source_id: file.source_id,
            name: file.name,
            description: file.description,
            url: file.url,
            published_at: file.published_at.unwrap_or(file.updated_at),
            updated_at: file.updated_at,
        }))
    }

    async fn read_posts(
        &self,
        dir: &Path,
        blog_key: &BlogKey,
    ) -> Result<Vec<BlogPost>, SourceError> {
        let posts_dir = dir.join("posts");
        let mut entries = match tokio::fs::read_dir(&posts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SourceError::Io(format!("{}: {e}", posts_dir.display()))),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::Io(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut posts = Vec::with_capacity(paths.len());
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
            let file: PostFile = serde_json::from_slice(&bytes)
                .map_err(|e| SourceError::Parse(format!("{}: {e}", path.display())))?;
            posts.push(file.into_post(blog_key, &stem));
        }
        Ok(posts)
    }
}

#[async_trait]
impl BlogSource for JsonDirectorySource {
    async fn get_data(
        &self,
        blog_key: &BlogKey,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<SourceData, SourceError> {
        let dir = self.root.join(blog_key.as_str());
        if !tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| SourceError::Io(e.to_string()))?
        {
            return Err(SourceError::NotFound);
        }

        let meta = self.read_meta(&dir, blog_key).await?;
        let all_posts = self.read_posts(&dir, blog_key).await?;
        let live_ids = all_posts.iter().map(|p| p.id.clone()).collect();
        let posts = all_posts
            .into_iter()
            .filter(|p| updated_after.is_none_or(|t| p.updated_at > t))
            .collect::<Vec<_>>();

        tracing::debug!(
            blog_key = %blog_key,
            dir = %dir.display(),
            posts = posts.len(),
            "Read blog from directory"
        );

        Ok(SourceData {
            meta,
            posts,
            live_ids: Some(live_ids),
        })
    }
}
