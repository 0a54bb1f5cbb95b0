//! Domain-level error types.

use thiserror::Error;

use crate::domain::BlogKey;

/// Domain errors - business rule and precondition failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by a content source while fetching a blog.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Blog not found at source")]
    NotFound,

    #[error("Source I/O failed: {0}")]
    Io(String),

    #[error("Source returned malformed data: {0}")]
    Parse(String),

    #[error("Source rejected credentials: {0}")]
    Unauthorized(String),
}

/// A transform failed on a single post or header.
#[derive(Debug, Error)]
#[error("Transform '{transform}' failed on post {post_id}: {message}")]
pub struct TransformError {
    pub transform: String,
    pub post_id: String,
    pub message: String,
}

impl TransformError {
    pub fn new(
        transform: impl Into<String>,
        post_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            transform: transform.into(),
            post_id: post_id.into(),
            message: message.into(),
        }
    }
}

/// Blog-scoped sync failures. Every variant carries the key that failed so a
/// multi-blog pass can report and move on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Fetching blog '{blog_key}' from source failed: {source}")]
    Source {
        blog_key: BlogKey,
        #[source]
        source: SourceError,
    },

    #[error("Storage failed for blog '{blog_key}': {source}")]
    Storage {
        blog_key: BlogKey,
        #[source]
        source: RepoError,
    },

    #[error("Invalid sync input for blog '{blog_key}': {source}")]
    Domain {
        blog_key: BlogKey,
        #[source]
        source: DomainError,
    },
}

impl SyncError {
    /// The blog key this failure is scoped to.
    pub fn blog_key(&self) -> &BlogKey {
        match self {
            SyncError::Source { blog_key, .. }
            | SyncError::Storage { blog_key, .. }
            | SyncError::Domain { blog_key, .. } => blog_key,
        }
    }
}

/// Errors surfaced by the query service.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] RepoError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl From<DomainError> for QueryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => QueryError::Validation(msg),
            other => QueryError::Storage(RepoError::Query(other.to_string())),
        }
    }
}
