//! Blog post entity for SeaORM.
//!
//! Besides the post itself each row carries two derived lowercase columns:
//! `tag_index` (`|tag-a|tag-b|`) and `search_text` (title, summary and
//! content). They only narrow queries down; the final match is always
//! decided against the domain post.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use blogsync_core::domain::{Author, BlogKey, BlogPost, BlogPostBase};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub blog_key: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    #[sea_orm(column_type = "Text")]
    pub tag_index: String,
    pub published_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub hash: Option<String>,
    pub author_id: Option<String>,
    pub author_name: String,
    pub author_image_url: Option<String>,
    pub author_url: Option<String>,
    pub author_source_id: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub source_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub search_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// `|a|b|` form of a tag list, lowercased, for `LIKE '%|tag|%'` lookups.
pub fn tag_index(tags: &[String]) -> String {
    let mut index = String::from("|");
    for tag in tags {
        index.push_str(&tag.trim().to_lowercase());
        index.push('|');
    }
    index
}

fn search_text(post: &BlogPost) -> String {
    format!("{}\n{}\n{}", post.title, post.summary, post.content).to_lowercase()
}

fn decode_tags(model: &Model) -> Vec<String> {
    serde_json::from_value(model.tags.clone()).unwrap_or_else(|e| {
        tracing::warn!(
            blog_key = %model.blog_key,
            id = %model.id,
            error = %e,
            "Stored tags are not a string list"
        );
        Vec::new()
    })
}

/// Conversion from SeaORM Model to domain BlogPost.
impl From<Model> for BlogPost {
    fn from(model: Model) -> Self {
        let tags = decode_tags(&model);
        Self {
            blog_key: BlogKey::new(&model.blog_key).unwrap_or_default(),
            id: model.id,
            slug: model.slug,
            title: model.title,
            tags,
            published_at: model.published_at.into(),
            updated_at: model.updated_at.into(),
            content: model.content,
            summary: model.summary,
            hash: model.hash,
            author: Author {
                id: model.author_id,
                name: model.author_name,
                image_url: model.author_image_url,
                url: model.author_url,
                source_id: model.author_source_id,
            },
            image_url: model.image_url,
            source_url: model.source_url,
            source_id: model.source_id,
        }
    }
}

/// Conversion from SeaORM Model to the diff baseline shape.
impl From<Model> for BlogPostBase {
    fn from(model: Model) -> Self {
        let tags = decode_tags(&model);
        Self {
            blog_key: BlogKey::new(&model.blog_key).unwrap_or_default(),
            id: model.id,
            slug: model.slug,
            title: model.title,
            tags,
            published_at: model.published_at.into(),
            updated_at: model.updated_at.into(),
            hash: model.hash,
        }
    }
}

/// Conversion from domain BlogPost to SeaORM ActiveModel.
impl From<BlogPost> for ActiveModel {
    fn from(post: BlogPost) -> Self {
        let tag_index = tag_index(&post.tags);
        let search_text = search_text(&post);
        Self {
            blog_key: Set(post.blog_key.into()),
            id: Set(post.id),
            slug: Set(post.slug),
            title: Set(post.title),
            tags: Set(Json::from(post.tags)),
            tag_index: Set(tag_index),
            published_at: Set(post.published_at.into()),
            updated_at: Set(post.updated_at.into()),
            content: Set(post.content),
            summary: Set(post.summary),
            hash: Set(post.hash),
            author_id: Set(post.author.id),
            author_name: Set(post.author.name),
            author_image_url: Set(post.author.image_url),
            author_url: Set(post.author.url),
            author_source_id: Set(post.author.source_id),
            image_url: Set(post.image_url),
            source_url: Set(post.source_url),
            source_id: Set(post.source_id),
            search_text: Set(search_text),
        }
    }
}
