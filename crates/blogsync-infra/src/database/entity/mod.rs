//! SeaORM entities for the `blog_metas` and `blog_posts` tables.

pub mod blog_meta;
pub mod blog_post;
