use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Validated pagination request. A `Paging` value always has a
/// non-negative page index and a positive page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: usize,
    page_size: usize,
}

impl Paging {
    pub fn new(page: i64, page_size: i64) -> Result<Self, DomainError> {
        if page < 0 {
            return Err(DomainError::Validation(format!(
                "Page index must be >= 0, got {page}"
            )));
        }
        if page_size <= 0 {
            return Err(DomainError::Validation(format!(
                "Page size must be > 0, got {page_size}"
            )));
        }
        let page = usize::try_from(page)
            .map_err(|_| DomainError::Validation(format!("Page index {page} out of range")))?;
        let page_size = usize::try_from(page_size)
            .map_err(|_| DomainError::Validation(format!("Page size {page_size} out of range")))?;
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items to skip; saturates instead of overflowing.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Slice one page out of an already filtered and ordered result.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size)
            .collect();
        Page {
            items,
            page: self.page,
            page_size: self.page_size,
            total,
        }
    }
}

/// One page of results. `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn empty(paging: Paging) -> Self {
        Self {
            items: Vec::new(),
            page: paging.page,
            page_size: paging.page_size,
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A calendar month used for archive listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchiveMonth {
    year: i32,
    month: u32,
}

impl ArchiveMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "Month must be within 1..=12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        Self::of(timestamp) == *self
    }
}

/// Number of posts carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Number of posts published in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCount {
    pub month: ArchiveMonth,
    pub count: usize,
}
