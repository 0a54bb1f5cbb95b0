//! Domain entities - blogs, posts and the shapes queries return.

mod blog_key;
mod meta;
mod paging;
mod post;
mod search;

pub use blog_key::BlogKey;
pub use meta::BlogMeta;
pub use paging::{ArchiveCount, ArchiveMonth, Page, Paging, TagCount};
pub use post::{Author, BlogPost, BlogPostBase, BlogPostHeader};
pub use search::SearchTerm;
