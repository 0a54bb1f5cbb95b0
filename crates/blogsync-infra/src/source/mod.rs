//! Content sources.

mod json_dir;

pub use json_dir::JsonDirectorySource;
