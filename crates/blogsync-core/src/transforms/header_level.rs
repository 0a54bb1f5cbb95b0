use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::{BlogPost, BlogPostHeader};
use crate::error::TransformError;
use crate::ports::Transform;

/// Opening or closing `h1`-`h6` tag; `<header>` and `<hr>` never match.
static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([hH])([1-6])\b").expect("heading regex should compile"));

/// Demotes HTML headings so post content nests under the page's own
/// headings. `<h1>` becomes `<h{1 + shift}>`, capped at `<h6>`.
///
/// Query transform: applying it twice shifts twice.
#[derive(Debug, Clone)]
pub struct HeaderLevelTransform {
    shift: u8,
}

impl HeaderLevelTransform {
    pub fn new(shift: u8) -> Self {
        Self { shift: shift.min(5) }
    }

    fn shift_headings(&self, html: &str) -> String {
        if self.shift == 0 {
            return html.to_string();
        }
        // Single pass, so a shifted tag is never shifted again.
        HEADING_REGEX
            .replace_all(html, |caps: &Captures| {
                let level = caps[3].as_bytes()[0] - b'0';
                let target = (level + self.shift).min(6);
                format!("<{}{}{}", &caps[1], &caps[2], target)
            })
            .into_owned()
    }
}

impl Transform for HeaderLevelTransform {
    fn name(&self) -> &'static str {
        "header_level"
    }

    fn transform_post(&self, post: &mut BlogPost) -> Result<(), TransformError> {
        post.content = self.shift_headings(&post.content);
        Ok(())
    }

    fn transform_header(&self, _header: &mut BlogPostHeader) -> Result<(), TransformError> {
        Ok(())
    }
}
