//! Transform port - content mutators run at ingestion or at read time.

use std::sync::Arc;

use crate::domain::{BlogPost, BlogPostHeader};
use crate::error::TransformError;

/// A content mutator.
///
/// Both hooks are required: a transform that only concerns full content
/// implements `transform_header` as a no-op. Storage transforms must be
/// idempotent, since re-synced posts may already carry their output.
pub trait Transform: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError>;

    fn transform_header(&self, header: &mut BlogPostHeader) -> Result<(), TransformError>;
}

/// Ordered list of transforms applied in sequence.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub fn push(&mut self, transform: Arc<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run every transform on a post; the first failure stops the chain.
    pub fn apply_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
        for transform in &self.transforms {
            transform.transform_post(post)?;
        }
        Ok(())
    }

    /// Run every transform on a header; the first failure stops the chain.
    pub fn apply_header(&self, header: &mut BlogPostHeader) -> Result<(), TransformError> {
        for transform in &self.transforms {
            transform.transform_header(header)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlogKey;

    struct Append(&'static str);

    impl Transform for Append {
        fn name(&self) -> &'static str {
            "append"
        }

        fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
            post.content.push_str(self.0);
            Ok(())
        }

        fn transform_header(&self, header: &mut BlogPostHeader) -> Result<(), TransformError> {
            header.summary.push_str(self.0);
            Ok(())
        }
    }

    struct Fail;

    impl Transform for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
            Err(TransformError::new(self.name(), &post.id, "boom"))
        }

        fn transform_header(&self, _header: &mut BlogPostHeader) -> Result<(), TransformError> {
            Ok(())
        }
    }

    #[test]
    fn test_runs_in_order() {
        let pipeline = TransformPipeline::new().with(Append("a")).with(Append("b"));
        let mut post = BlogPost::new(BlogKey::new("k").unwrap(), "1");
        pipeline.apply_post(&mut post).unwrap();
        assert_eq!(post.content, "ab");

        let mut header = post.header();
        pipeline.apply_header(&mut header).unwrap();
        assert_eq!(header.summary, "ab");
    }

    #[test]
    fn test_failure_stops_chain() {
        let pipeline = TransformPipeline::new()
            .with(Append("a"))
            .with(Fail)
            .with(Append("b"));
        let mut post = BlogPost::new(BlogKey::new("k").unwrap(), "1");
        let err = pipeline.apply_post(&mut post).unwrap_err();
        assert_eq!(err.transform, "fail");
        assert_eq!(err.post_id, "1");
        assert_eq!(post.content, "a");
    }
}
