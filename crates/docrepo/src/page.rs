//! Paged query results.

use serde::Serialize;

/// One page of a query.
///
/// `page` is the index the caller asked for; the repository skips
/// `page * size` documents to produce `items`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: u64,
    pub size: u64,
    /// Total number of matching documents
    pub count: u64,
    /// Total number of pages, `ceil(count / size)`
    pub pages: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, size: u64, count: u64) -> Self {
        let pages = if size > 0 { count.div_ceil(size) } else { 0 };

        Self {
            page,
            size,
            count,
            pages,
            items,
        }
    }

    /// True from page index 2 onward. Skip arithmetic is zero-based, yet
    /// page 1 still reports no previous page.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            size: self.size,
            count: self.count,
            pages: self.pages,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
