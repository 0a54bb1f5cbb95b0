use crate::error::DomainError;

use super::BlogPost;

/// A validated, normalized search needle.
///
/// Matching is a case-insensitive substring match that must start on a word
/// boundary: at the start of the text or right after a non-alphanumeric
/// character. It is not ranked and not fuzzy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(text: &str) -> Result<Self, DomainError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Err(DomainError::Validation(
                "Search text must not be blank".to_string(),
            ));
        }
        Ok(Self(needle))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches_text(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        haystack.match_indices(self.0.as_str()).any(|(idx, _)| {
            haystack[..idx]
                .chars()
                .next_back()
                .is_none_or(|prev| !prev.is_alphanumeric())
        })
    }

    /// Search title, summary and content.
    pub fn matches_post(&self, post: &BlogPost) -> bool {
        self.matches_text(&post.title)
            || self.matches_text(&post.summary)
            || self.matches_text(&post.content)
    }
}
