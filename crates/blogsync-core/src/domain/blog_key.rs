use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Case-insensitive partition key identifying one blog.
///
/// The value is trimmed and lowercased on construction, so the derived
/// equality, hashing and ordering are all case-insensitive. The empty key
/// returned by [`BlogKey::all`] is a query sentinel meaning "every blog"; it
/// never round-trips through serde and is rejected as a sync target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlogKey(String);

impl BlogKey {
    /// Create a key from non-empty input.
    pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::Validation(
                "Blog key must not be empty".to_string(),
            ));
        }
        Ok(Self(normalized))
    }

    /// The "match all blogs" sentinel.
    pub fn all() -> Self {
        Self(String::new())
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `self` used as a filter selects `key`.
    pub fn matches(&self, key: &BlogKey) -> bool {
        self.is_all() || self == key
    }

    /// True when a filter list selects `key`. An empty list, or one that
    /// contains the sentinel, selects every blog.
    pub fn any_matches(filter: &[BlogKey], key: &BlogKey) -> bool {
        filter.is_empty() || filter.iter().any(|f| f.matches(key))
    }
}

impl fmt::Display for BlogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlogKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for BlogKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BlogKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlogKey> for String {
    fn from(key: BlogKey) -> Self {
        key.0
    }
}
