//! Built-in content transforms.
//!
//! Storage transforms: [`SummaryTransform`], [`ImageUrlTransform`].
//! Query transforms: [`HeaderLevelTransform`].

mod header_level;
mod html;
mod image_url;
mod summary;

pub use header_level::HeaderLevelTransform;
pub use image_url::ImageUrlTransform;
pub use summary::SummaryTransform;
