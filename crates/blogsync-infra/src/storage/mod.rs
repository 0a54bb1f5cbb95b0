//! Storage backends - in-memory reference implementation and the checks
//! every backend runs before committing a change set.

mod memory;

use std::collections::HashSet;

use blogsync_core::domain::{BlogKey, BlogMeta, BlogPost, BlogPostBase};
use blogsync_core::error::RepoError;

pub use memory::InMemoryStorage;

/// Reject a change set that touches another blog or lists one id in more
/// than one set. Runs before any state is modified.
pub(crate) fn validate_update(
    blog_key: &BlogKey,
    meta: Option<&BlogMeta>,
    inserted: &[BlogPost],
    updated: &[BlogPost],
    deleted: &[BlogPostBase],
) -> Result<(), RepoError> {
    if blog_key.is_all() {
        return Err(RepoError::InvalidInput(
            "Cannot update the all-blogs key".to_string(),
        ));
    }
    if let Some(meta) = meta {
        if &meta.blog_key != blog_key {
            return Err(RepoError::InvalidInput(format!(
                "Meta for blog '{}' passed to update of '{blog_key}'",
                meta.blog_key
            )));
        }
    }

    let mut seen = HashSet::new();
    let ids = inserted
        .iter()
        .chain(updated)
        .map(|p| (&p.blog_key, &p.id))
        .chain(deleted.iter().map(|p| (&p.blog_key, &p.id)));
    for (key, id) in ids {
        if key != blog_key {
            return Err(RepoError::InvalidInput(format!(
                "Post '{id}' belongs to blog '{key}', not '{blog_key}'"
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(RepoError::InvalidInput(format!(
                "Post '{id}' appears more than once in the change set"
            )));
        }
    }
    Ok(())
}
