use crate::domain::{BlogPost, BlogPostHeader};
use crate::error::TransformError;
use crate::ports::Transform;

use super::html::first_image_src;

/// Sets a missing `image_url` to the first image in the content.
#[derive(Debug, Clone, Default)]
pub struct ImageUrlTransform;

impl Transform for ImageUrlTransform {
    fn name(&self) -> &'static str {
        "image_url"
    }

    fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
        let missing = post.image_url.as_deref().is_none_or(|url| url.trim().is_empty());
        if missing {
            post.image_url = first_image_src(&post.content);
        }
        Ok(())
    }

    fn transform_header(&self, _header: &mut BlogPostHeader) -> Result<(), TransformError> {
        Ok(())
    }
}
