use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BlogKey;

/// Blog-level metadata. `updated_at` is the sync watermark for the blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogMeta {
    pub blog_key: BlogKey,
    pub id: String,
    pub source_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogMeta {
    /// Create metadata with both timestamps set to `updated_at`.
    pub fn new(blog_key: BlogKey, name: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: blog_key.to_string(),
            blog_key,
            source_id: None,
            name: name.into(),
            description: None,
            url: None,
            published_at: updated_at,
            updated_at,
        }
    }
}
