//! Blog meta entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use blogsync_core::domain::{BlogKey, BlogMeta};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blog_metas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub blog_key: String,
    pub id: String,
    pub source_id: Option<String>,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to domain BlogMeta.
impl From<Model> for BlogMeta {
    fn from(model: Model) -> Self {
        Self {
            blog_key: BlogKey::new(&model.blog_key).unwrap_or_default(),
            id: model.id,
            source_id: model.source_id,
            name: model.name,
            description: model.description,
            url: model.url,
            published_at: model.published_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Conversion from domain BlogMeta to SeaORM ActiveModel.
impl From<BlogMeta> for ActiveModel {
    fn from(meta: BlogMeta) -> Self {
        Self {
            blog_key: Set(meta.blog_key.into()),
            id: Set(meta.id),
            source_id: Set(meta.source_id),
            name: Set(meta.name),
            description: Set(meta.description),
            url: Set(meta.url),
            published_at: Set(meta.published_at.into()),
            updated_at: Set(meta.updated_at.into()),
        }
    }
}
