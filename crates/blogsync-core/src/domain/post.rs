use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::BlogKey;

/// Post author as reported by the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<String>,
    pub name: String,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub source_id: Option<String>,
}

/// Lightweight post shape storage returns for diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostBase {
    pub blog_key: BlogKey,
    pub id: String,
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hash: Option<String>,
}

impl BlogPostBase {
    /// Compare the fields a header carries, ignoring the fingerprint.
    pub fn same_fields(&self, other: &BlogPostBase) -> bool {
        self.slug == other.slug
            && self.title == other.title
            && self.tags == other.tags
            && self.published_at == other.published_at
            && self.updated_at == other.updated_at
    }
}

/// Full post, as fetched from a source and persisted by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub blog_key: BlogKey,
    pub id: String,
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content: String,
    pub summary: String,
    pub hash: Option<String>,
    pub author: Author,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub source_id: Option<String>,
}

/// The fields that define a post's identity for change detection.
#[derive(Serialize)]
struct Fingerprint<'a> {
    slug: &'a str,
    title: &'a str,
    tags: &'a [String],
    published_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
    content: &'a str,
    summary: &'a str,
    author: &'a Author,
    image_url: &'a Option<String>,
    source_url: &'a Option<String>,
    source_id: &'a Option<String>,
}

impl BlogPost {
    /// Create an empty post stamped with the current time.
    pub fn new(blog_key: BlogKey, id: impl Into<String>) -> Self {
        let now = Utc::now();
        let id = id.into();
        Self {
            blog_key,
            slug: id.clone(),
            id,
            title: String::new(),
            tags: Vec::new(),
            published_at: now,
            updated_at: now,
            content: String::new(),
            summary: String::new(),
            hash: None,
            author: Author::default(),
            image_url: None,
            source_url: None,
            source_id: None,
        }
    }

    /// Hex SHA-256 over the canonical JSON of the significant fields.
    ///
    /// `blog_key`, `id` and `hash` are not part of the fingerprint.
    pub fn fingerprint(&self) -> String {
        let significant = Fingerprint {
            slug: &self.slug,
            title: &self.title,
            tags: &self.tags,
            published_at: &self.published_at,
            updated_at: &self.updated_at,
            content: &self.content,
            summary: &self.summary,
            author: &self.author,
            image_url: &self.image_url,
            source_url: &self.source_url,
            source_id: &self.source_id,
        };
        // Serializing borrowed strings and chrono timestamps cannot fail.
        let bytes = serde_json::to_vec(&significant).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Set `hash` from the current content if the source left it empty.
    pub fn ensure_hash(&mut self) -> &str {
        if self.hash.is_none() {
            self.hash = Some(self.fingerprint());
        }
        self.hash.as_deref().unwrap_or_default()
    }

    pub fn base(&self) -> BlogPostBase {
        BlogPostBase {
            blog_key: self.blog_key.clone(),
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            published_at: self.published_at,
            updated_at: self.updated_at,
            hash: self.hash.clone(),
        }
    }

    pub fn header(&self) -> BlogPostHeader {
        BlogPostHeader {
            blog_key: self.blog_key.clone(),
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            published_at: self.published_at,
            updated_at: self.updated_at,
            summary: self.summary.clone(),
            author: self.author.clone(),
            image_url: self.image_url.clone(),
            source_url: self.source_url.clone(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }
}

/// Listing projection of a post, without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostHeader {
    pub blog_key: BlogKey,
    pub id: String,
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub summary: String,
    pub author: Author,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}
