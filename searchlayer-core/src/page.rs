//! Pagination types for search results.
//!
//! A [`PageRequest`] says how many results to skip and how many to return; the engine applies
//! it as `from`/`size`. The resulting [`Page`] carries the decoded items together with the total
//! number of matches, so callers can tell whether more pages exist.
//!
//! # Example
//!
//! ```ignore
//! use searchlayer::page::PageRequest;
//!
//! let request = PageRequest::builder().with_limit(10).with_offset(20).build();
//! let page = users.search(&filter, "-age", request).await?;
//!
//! if let Some(offset) = page.next_offset() {
//!     let next = users.search(&filter, "-age", PageRequest::new(10, offset)).await?;
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A single page of search results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items of this page, in engine order.
    pub items: Vec<T>,
    /// Number of documents matching the search across all pages.
    pub total: u64,
    /// Number of matches skipped before this page.
    pub offset: usize,
    /// The requested page size.
    pub limit: usize,
}

impl<T> Page<T> {
    /// Wraps one page of `items` fetched with `request` out of `total` matches.
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            offset: request.offset,
            limit: request.limit,
        }
    }

    /// The number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether matches exist beyond this page.
    ///
    /// An empty page never has more: following it would not advance the offset.
    pub fn has_more(&self) -> bool {
        !self.items.is_empty() && ((self.offset + self.items.len()) as u64) < self.total
    }

    /// The offset of the following page, if any.
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more()
            .then(|| self.offset + self.items.len())
    }

    /// The offset of the preceding page, or `None` on the first page.
    pub fn previous_offset(&self) -> Option<usize> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }

    /// Converts the items, keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Which slice of the matches to return.
///
/// # Example
///
/// ```ignore
/// use searchlayer::page::PageRequest;
///
/// // The third page of 25.
/// let request = PageRequest::from_page_number(3, 25);
/// assert_eq!(request.offset, 50);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Number of matches to skip.
    pub offset: usize,
}

impl PageRequest {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Creates a request for a 1-indexed page number. Page `0` is treated as page `1`.
    pub fn from_page_number(page: usize, per_page: usize) -> Self {
        Self {
            limit: per_page,
            offset: page
                .saturating_sub(1)
                .saturating_mul(per_page),
        }
    }

    /// Starts a builder with the default limit and offset.
    pub fn builder() -> PageRequestBuilder {
        PageRequestBuilder::new()
    }

    /// The request for the page after this one.
    pub fn next(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset.saturating_add(self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Builder for [`PageRequest`].
#[derive(Debug, Default)]
pub struct PageRequestBuilder {
    limit: Option<usize>,
    offset: Option<usize>,
}

impl PageRequestBuilder {
    pub fn new() -> Self {
        Self { limit: None, offset: None }
    }

    /// Sets the maximum number of items.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of matches to skip.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Builds the request, defaulting to the first page of [`DEFAULT_PAGE_SIZE`] items.
    pub fn build(self) -> PageRequest {
        PageRequest {
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        }
    }
}
