//! Client-side page slicing and the server page envelope.

use serde::Deserialize;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// 1-based page request. Page 0 is treated as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        PageRequest {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Changing the page size always goes back to the first page.
    pub fn with_page_size(self, page_size: usize) -> Self {
        PageRequest::new(1, page_size)
    }

    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.page_size)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.max(1).to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

/// One page of a larger list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based index range of the items on this page, for "showing 21-40 of 93".
    pub fn shown_range(&self) -> Option<(usize, usize)> {
        if self.items.is_empty() {
            return None;
        }
        let first = (self.page.max(1) - 1) * self.page_size + 1;
        Some((first, first + self.items.len() - 1))
    }
}

/// Slice `items` for the requested page.
///
/// `len == min(page_size, max(0, N - (page - 1) * page_size))`
pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let start = request.offset().min(items.len());
    let end = start.saturating_add(request.page_size).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        page: request.page.max(1),
        page_size: request.page_size,
        total: items.len(),
    }
}

/// Server-paginated listing. The server's `total` is trusted as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPage<T> {
    #[serde(alias = "data", alias = "students")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl<T> ServerPage<T> {
    pub fn into_page(self, request: PageRequest) -> Page<T> {
        let total = self.total.unwrap_or(request.offset() + self.items.len());
        Page {
            page: self.page.unwrap_or(request.page),
            page_size: self.page_size.unwrap_or(request.page_size),
            items: self.items,
            total,
        }
    }
}
