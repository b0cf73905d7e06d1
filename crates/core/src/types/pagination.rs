//! Page-number pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// A clamped page request.
///
/// Pages are 1-based. `per_page` is clamped to `1..=max` so a client can
/// never request an unbounded result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a page request from optional query parameters.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32, max: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, max.max(1)),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// SQL `OFFSET` for this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// SQL `LIMIT` for this page.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.per_page as u64
    }

    /// Slice an already materialized list down to this page.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let end = start.saturating_add(self.per_page as usize);
        items.get(start..end.min(items.len())).unwrap_or(&[])
    }

    /// Describe this page given the total row count.
    #[must_use]
    pub fn describe(&self, total: u64) -> Pagination {
        Pagination::new(self.page, self.per_page, total)
    }
}

/// Pagination block returned alongside list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<u32>,
    pub next_num: Option<u32>,
}

impl Pagination {
    /// Compute the pagination block. An empty result still reports one page.
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page_u64 = u64::from(per_page.max(1));
        let pages = total.div_ceil(per_page_u64).max(1);
        let has_prev = page > 1;
        let has_next = u64::from(page) < pages;

        Self {
            page,
            per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(10_000), 50, 500);
        assert_eq!(req.page(), 1);
        assert_eq!(req.per_page(), 500);

        let req = PageRequest::new(None, None, 20, 100);
        assert_eq!(req.per_page(), 20);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(25), 50, 500);
        assert_eq!(req.offset(), 50);
        assert_eq!(req.limit(), 25);
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(PageRequest::new(Some(2), Some(2), 2, 10).slice(&items), &[3, 4]);
        assert_eq!(PageRequest::new(Some(3), Some(2), 2, 10).slice(&items), &[5]);
        assert!(PageRequest::new(Some(9), Some(2), 2, 10).slice(&items).is_empty());
    }

    #[test]
    fn test_pagination_block() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.pages, 4);
        assert!(p.has_prev && p.has_next);
        assert_eq!(p.prev_num, Some(1));
        assert_eq!(p.next_num, Some(3));

        let empty = Pagination::new(1, 50, 0);
        assert_eq!(empty.pages, 1);
        assert!(!empty.has_prev && !empty.has_next);
        assert_eq!(empty.next_num, None);
    }
}
