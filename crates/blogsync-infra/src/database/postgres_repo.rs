//! PostgreSQL storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::sea_query::{LikeExpr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, TransactionTrait,
};

use blogsync_core::domain::{
    ArchiveCount, ArchiveMonth, BlogKey, BlogMeta, BlogPost, BlogPostBase, BlogPostHeader, Page,
    Paging, SearchTerm, TagCount,
};
use blogsync_core::error::RepoError;
use blogsync_core::ports::{StorageQueryRepository, StorageSyncRepository, count_months, count_tags};

use super::entity::blog_meta::{self, Entity as BlogMetaEntity};
use super::entity::blog_post::{self, Entity as BlogPostEntity};
use crate::storage::validate_update;

/// Rows per upsert statement; keeps bind parameters well under Postgres' limit.
const UPSERT_BATCH: usize = 500;

fn query_err(e: DbErr) -> RepoError {
    match e {
        DbErr::Conn(err) => RepoError::Connection(err.to_string()),
        other => {
            let err_str = other.to_string();
            if err_str.contains("duplicate") || err_str.contains("unique") {
                RepoError::Constraint(err_str)
            } else {
                RepoError::Query(err_str)
            }
        }
    }
}

/// Restrict a post query to the blogs selected by `keys`.
fn key_condition(keys: &[BlogKey]) -> Condition {
    if keys.is_empty() || keys.iter().any(BlogKey::is_all) {
        return Condition::all();
    }
    let keys = keys.iter().map(|k| k.as_str().to_string());
    Condition::all().add(blog_post::Column::BlogKey.is_in(keys))
}

/// `%needle%`, with LIKE wildcards and the escape character in `needle`
/// matched literally.
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

/// `[start, end)` of a calendar month in UTC.
fn month_bounds(month: ArchiveMonth) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc
        .with_ymd_and_hms(month.year(), month.month(), 1, 0, 0, 0)
        .single()?;
    let (year, next) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    let end = Utc.with_ymd_and_hms(year, next, 1, 0, 0, 0).single()?;
    Some((start, end))
}

/// PostgreSQL-backed storage for blog metas and posts.
///
/// Every change set commits in a single transaction.
pub struct PostgresBlogStorage {
    pub(crate) db: DbConn,
}

impl PostgresBlogStorage {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    fn posts(keys: &[BlogKey]) -> Select<BlogPostEntity> {
        BlogPostEntity::find()
            .filter(key_condition(keys))
            .order_by_desc(blog_post::Column::PublishedAt)
            .order_by_asc(blog_post::Column::Id)
    }

    /// Count and fetch one page straight from the database.
    async fn page(
        &self,
        query: Select<BlogPostEntity>,
        paging: Paging,
    ) -> Result<Page<BlogPost>, RepoError> {
        let total = query.clone().count(&self.db).await.map_err(query_err)?;
        let rows = query
            .offset(paging.offset() as u64)
            .limit(paging.page_size() as u64)
            .all(&self.db)
            .await
            .map_err(query_err)?;
        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            page: paging.page(),
            page_size: paging.page_size(),
            total: total as usize,
        })
    }

    /// Fetch every candidate row, then let the domain predicate decide.
    async fn refined(
        &self,
        query: Select<BlogPostEntity>,
        paging: Paging,
        keep: impl Fn(&BlogPost) -> bool,
    ) -> Result<Page<BlogPost>, RepoError> {
        let rows = query.all(&self.db).await.map_err(query_err)?;
        let posts: Vec<BlogPost> = rows
            .into_iter()
            .map(BlogPost::from)
            .filter(|post| keep(post))
            .collect();
        Ok(paging.apply(posts))
    }
}

#[async_trait]
impl StorageSyncRepository for PostgresBlogStorage {
    async fn get_last_updated_at(
        &self,
        blog_key: &BlogKey,
    ) -> Result<Option<DateTime<Utc>>, RepoError> {
        let meta = BlogMetaEntity::find_by_id(blog_key.as_str().to_string())
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(meta.map(|m| m.updated_at.into()))
    }

    async fn get_posts(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<BlogPostBase>, RepoError> {
        let mut query =
            BlogPostEntity::find().filter(blog_post::Column::BlogKey.eq(blog_key.as_str()));
        if let Some(after) = after {
            query = query.filter(blog_post::Column::UpdatedAt.gt(after));
        }
        let rows = query.all(&self.db).await.map_err(query_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
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
        let key = blog_key.as_str().to_string();

        let txn = self.db.begin().await.map_err(query_err)?;

        if prior_watermark.is_none() {
            BlogPostEntity::delete_many()
                .filter(blog_post::Column::BlogKey.eq(key.as_str()))
                .exec(&txn)
                .await
                .map_err(query_err)?;
        } else if !deleted.is_empty() {
            BlogPostEntity::delete_many()
                .filter(blog_post::Column::BlogKey.eq(key.as_str()))
                .filter(blog_post::Column::Id.is_in(deleted.into_iter().map(|p| p.id)))
                .exec(&txn)
                .await
                .map_err(query_err)?;
        }

        let mut rows: Vec<blog_post::ActiveModel> = inserted
            .into_iter()
            .chain(updated)
            .map(Into::into)
            .collect();
        while !rows.is_empty() {
            let rest = rows.split_off(rows.len().min(UPSERT_BATCH));
            let batch = std::mem::replace(&mut rows, rest);
            BlogPostEntity::insert_many(batch)
                .on_conflict(
                    OnConflict::columns([blog_post::Column::BlogKey, blog_post::Column::Id])
                        .update_columns([
                            blog_post::Column::Slug,
                            blog_post::Column::Title,
                            blog_post::Column::Tags,
                            blog_post::Column::TagIndex,
                            blog_post::Column::PublishedAt,
                            blog_post::Column::UpdatedAt,
                            blog_post::Column::Content,
                            blog_post::Column::Summary,
                            blog_post::Column::Hash,
                            blog_post::Column::AuthorId,
                            blog_post::Column::AuthorName,
                            blog_post::Column::AuthorImageUrl,
                            blog_post::Column::AuthorUrl,
                            blog_post::Column::AuthorSourceId,
                            blog_post::Column::ImageUrl,
                            blog_post::Column::SourceUrl,
                            blog_post::Column::SourceId,
                            blog_post::Column::SearchText,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(query_err)?;
        }

        if let Some(mut meta) = meta {
            let current = BlogMetaEntity::find_by_id(key.clone())
                .one(&txn)
                .await
                .map_err(query_err)?;
            if let Some(current) = current {
                meta.updated_at = meta.updated_at.max(current.updated_at.into());
            }
            BlogMetaEntity::insert(blog_meta::ActiveModel::from(meta))
                .on_conflict(
                    OnConflict::column(blog_meta::Column::BlogKey)
                        .update_columns([
                            blog_meta::Column::Id,
                            blog_meta::Column::SourceId,
                            blog_meta::Column::Name,
                            blog_meta::Column::Description,
                            blog_meta::Column::Url,
                            blog_meta::Column::PublishedAt,
                            blog_meta::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(query_err)?;
        }

        txn.commit().await.map_err(query_err)?;
        tracing::debug!(blog_key = %blog_key, "Committed change set");
        Ok(())
    }
}

#[async_trait]
impl StorageQueryRepository for PostgresBlogStorage {
    async fn get_meta(
        &self,
        blog_key: &BlogKey,
        after: Option<DateTime<Utc>>,
    ) -> Result<Option<BlogMeta>, RepoError> {
        let meta = BlogMetaEntity::find_by_id(blog_key.as_str().to_string())
            .one(&self.db)
            .await
            .map_err(query_err)?
            .map(BlogMeta::from);
        Ok(meta.filter(|m| after.is_none_or(|t| m.updated_at > t)))
    }

    async fn get_post(&self, id: &str, blog_key: &BlogKey) -> Result<Option<BlogPost>, RepoError> {
        let post = Self::posts(std::slice::from_ref(blog_key))
            .filter(blog_post::Column::Id.eq(id))
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(post.map(Into::into))
    }

    async fn get_post_by_slug(
        &self,
        slug: &str,
        blog_key: &BlogKey,
    ) -> Result<Option<BlogPost>, RepoError> {
        let post = Self::posts(std::slice::from_ref(blog_key))
            .filter(blog_post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(query_err)?;
        Ok(post.map(Into::into))
    }

    async fn list_post_headers(
        &self,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError> {
        let page = self.page(Self::posts(keys), paging).await?;
        Ok(page.map(|post| post.header()))
    }

    async fn list_posts_by_archive(
        &self,
        month: ArchiveMonth,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError> {
        let Some((start, end)) = month_bounds(month) else {
            return Ok(Page::empty(paging));
        };
        let query = Self::posts(keys)
            .filter(blog_post::Column::PublishedAt.gte(start))
            .filter(blog_post::Column::PublishedAt.lt(end));
        self.page(query, paging).await
    }

    async fn list_posts_by_tag(
        &self,
        tag: &str,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPost>, RepoError> {
        let needle = blog_post::tag_index(&[tag.to_string()]);
        let query =
            Self::posts(keys).filter(blog_post::Column::TagIndex.like(contains_pattern(&needle)));
        self.refined(query, paging, |post| post.has_tag(tag)).await
    }

    async fn search_post_headers(
        &self,
        term: &SearchTerm,
        paging: Paging,
        keys: &[BlogKey],
    ) -> Result<Page<BlogPostHeader>, RepoError> {
        let query = Self::posts(keys)
            .filter(blog_post::Column::SearchText.like(contains_pattern(term.as_str())));
        let page = self
            .refined(query, paging, |post| term.matches_post(post))
            .await?;
        Ok(page.map(|post| post.header()))
    }

    async fn list_all_tags(&self, keys: &[BlogKey]) -> Result<Vec<TagCount>, RepoError> {
        let rows: Vec<sea_orm::prelude::Json> = BlogPostEntity::find()
            .filter(key_condition(keys))
            .select_only()
            .column(blog_post::Column::Tags)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(query_err)?;
        let tag_lists: Vec<Vec<String>> = rows
            .into_iter()
            .filter_map(|tags| serde_json::from_value(tags).ok())
            .collect();
        Ok(count_tags(tag_lists.iter().map(Vec::as_slice)))
    }

    async fn list_all_dates(&self, keys: &[BlogKey]) -> Result<Vec<ArchiveCount>, RepoError> {
        let rows: Vec<sea_orm::prelude::DateTimeWithTimeZone> = BlogPostEntity::find()
            .filter(key_condition(keys))
            .select_only()
            .column(blog_post::Column::PublishedAt)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(query_err)?;
        let dates: Vec<DateTime<Utc>> = rows.into_iter().map(Into::into).collect();
        Ok(count_months(dates.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds_rolls_year() {
        let (start, end) = month_bounds(ArchiveMonth::new(2023, 12).unwrap()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        use sea_orm::QueryTrait;

        let stmt = BlogPostEntity::find()
            .filter(blog_post::Column::SearchText.like(contains_pattern(r"50%_off\now")))
            .build(sea_orm::DbBackend::Postgres);

        assert!(stmt.sql.contains("ESCAPE"), "{}", stmt.sql);
        let values = stmt.values.unwrap().0;
        assert!(values.contains(&sea_orm::Value::from(r"%50\%\_off\\now%")));
    }

    #[test]
    fn test_tag_index_is_lowercase() {
        let tags = vec!["Rust".to_string(), " Async ".to_string()];
        assert_eq!(blog_post::tag_index(&tags), "|rust|async|");
    }
}
