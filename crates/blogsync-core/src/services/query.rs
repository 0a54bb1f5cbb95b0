//! Query service - validated, transformed reads over query storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{
    ArchiveCount, ArchiveMonth, BlogKey, BlogMeta, BlogPost, BlogPostHeader, Page, Paging,
    SearchTerm, TagCount,
};
use crate::error::QueryError;
use crate::ports::{StorageQueryRepository, TransformPipeline};

/// Read API over a [`StorageQueryRepository`].
///
/// Query transforms run on a copy of every post or header returned; nothing
/// is written back. Single-post reads fail when a transform fails, while
/// listings leave the failing item out.
#[derive(Clone)]
pub struct QueryService {
    repository: Arc<dyn StorageQueryRepository>,
    transforms: TransformPipeline,
}

impl QueryService {
    pub fn new(repository: Arc<dyn StorageQueryRepository>, transforms: TransformPipeline) -> Self {
        Self {
            repository,
            transforms,
        }
    }

    pub async fn get_meta(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Option<BlogMeta>, QueryError> {
        Ok(self.repository.get_meta(blog_key, after).await?)
    }

    pub async fn get_post(
        &self,
        id: &str,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogPost>, QueryError> {
        let post = self.repository.get_post(id, blog_key).await?;
        self.transform_one(post)
    }

    pub async fn get_post_by_slug(
        &self,
        slug: &str,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogPost>, QueryError> {
        let post = self.repository.get_post_by_slug(slug, blog_key).await?;
        self.transform_one(post)
    }

    pub async fn list_post_headers(
        &self,
        keys: &[BlogKey],
        page: i64,
        page_size: i64,
    ) -> Result<Page<BlogPostHeader>, QueryError> {
        let paging = Paging::new(page, page_size)?;
        let headers = self.repository.list_post_headers(paging, keys).await?;
        Ok(self.transform_headers(headers))
    }

    pub async fn list_posts_by_archive(
        &self,
        year: i32,
        month: u32,
        keys: &[BlogKey],
        page: i64,
        page_size: i64,
    ) -> Result<Page<BlogPost>, QueryError> {
        let paging = Paging::new(page, page_size)?;
        let month = ArchiveMonth::new(year, month)?;
        let posts = self
            .repository
            .list_posts_by_archive(month, paging, keys)
            .await?;
        Ok(self.transform_posts(posts))
    }

    pub async fn list_posts_by_tag(
        &self,
        tag: &str,
        keys: &[BlogKey],
        page: i64,
        page_size: i64,
    ) -> Result<Page<BlogPost>, QueryError> {
        let paging = Paging::new(page, page_size)?;
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(QueryError::Validation("Tag must not be blank".to_string()));
        }
        let posts = self.repository.list_posts_by_tag(tag, paging, keys).await?;
        Ok(self.transform_posts(posts))
    }

    pub async fn search_post_headers(
        &self,
        text: &str,
        keys: &[BlogKey],
        page: i64,
        page_size: i64,
    ) -> Result<Page<BlogPostHeader>, QueryError> {
        let paging = Paging::new(page, page_size)?;
        let term = SearchTerm::new(text)?;
        let headers = self
            .repository
            .search_post_headers(&term, paging, keys)
            .await?;
        Ok(self.transform_headers(headers))
    }

    pub async fn list_all_tags(&self, keys: &[BlogKey]) -> Result<Vec<TagCount>, QueryError> {
        Ok(self.repository.list_all_tags(keys).await?)
    }

    pub async fn list_all_dates(&self, keys: &[BlogKey]) -> Result<Vec<ArchiveCount>, QueryError> {
        Ok(self.repository.list_all_dates(keys).await?)
    }

    fn transform_one(&self, post: Option<BlogPost>) -> Result<Option<BlogPost>, QueryError> {
        match post {
            Some(mut post) => {
                self.transforms.apply_post(&mut post)?;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    fn transform_posts(&self, page: Page<BlogPost>) -> Page<BlogPost> {
        let Page {
            items,
            page,
            page_size,
            total,
        } = page;
        let items = items
            .into_iter()
            .filter_map(|mut post| match self.transforms.apply_post(&mut post) {
                Ok(()) => Some(post),
                Err(e) => {
                    tracing::warn!(error = %e, "Leaving post out of listing");
                    None
                }
            })
            .collect();
        Page {
            items,
            page,
            page_size,
            total,
        }
    }

    fn transform_headers(&self, page: Page<BlogPostHeader>) -> Page<BlogPostHeader> {
        let Page {
            items,
            page,
            page_size,
            total,
        } = page;
        let items = items
            .into_iter()
            .filter_map(|mut header| match self.transforms.apply_header(&mut header) {
                Ok(()) => Some(header),
                Err(e) => {
                    tracing::warn!(error = %e, "Leaving header out of listing");
                    None
                }
            })
            .collect();
        Page {
            items,
            page,
            page_size,
            total,
        }
    }
}
