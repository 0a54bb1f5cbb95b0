use crate::domain::{BlogPost, BlogPostHeader};
use crate::error::TransformError;
use crate::ports::Transform;

use super::html::plain_text;

/// Fills an empty summary with a plain-text excerpt of the content.
///
/// Storage transform. Posts that already have a summary are left alone, so
/// running it again is a no-op.
#[derive(Debug, Clone)]
pub struct SummaryTransform {
    max_chars: usize,
}

impl SummaryTransform {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    fn excerpt(&self, content: &str) -> String {
        let text = plain_text(content);
        if text.chars().count() <= self.max_chars {
            return text;
        }
        let cut: String = text.chars().take(self.max_chars).collect();
        let cut = match cut.rfind(' ') {
            Some(idx) if idx > 0 => &cut[..idx],
            _ => cut.as_str(),
        };
        format!("{}…", cut.trim_end())
    }
}

impl Default for SummaryTransform {
    fn default() -> Self {
        Self::new(300)
    }
}

impl Transform for SummaryTransform {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
        if post.summary.trim().is_empty() {
            post.summary = self.excerpt(&post.content);
        }
        Ok(())
    }

    fn transform_header(&self, _header: &mut BlogPostHeader) -> Result<(), TransformError> {
        Ok(())
    }
}
