//! Pagination types shared by list endpoints

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_PER_PAGE: u32 = 200;

/// Default items per page
const DEFAULT_PER_PAGE: u32 = 50;

/// Pagination parameters
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 200)
    pub per_page: u32,
}

impl Pagination {
    /// Create pagination with clamping.
    ///
    /// - Page is clamped to minimum of 1
    /// - Per page is clamped to 1..=200
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Total count across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    /// Wrap one page of rows.
    pub fn new(items: Vec<T>, total: i64, page: Pagination) -> Self {
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }

    /// Convert items while keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 {
            1
        } else {
            ((self.total as u64).div_ceil(self.per_page as u64) as u32).max(1)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Query parameters for pagination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PaginationParams> for Pagination {
    fn from(params: PaginationParams) -> Self {
        Self::new(
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_calculation() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
    }

    #[test]
    fn clamps_bounds() {
        assert_eq!(Pagination::new(0, 10).page, 1);
        assert_eq!(Pagination::new(1, 0).per_page, 1);
        assert_eq!(Pagination::new(1, 999).per_page, 200);
    }

    #[test]
    fn total_pages_and_next() {
        let empty: Paginated<()> = Paginated::new(vec![], 0, Pagination::new(1, 10));
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());

        let first: Paginated<()> = Paginated::new(vec![], 25, Pagination::new(1, 10));
        assert_eq!(first.total_pages(), 3);
        assert!(first.has_next());

        let last: Paginated<()> = Paginated::new(vec![], 25, Pagination::new(3, 10));
        assert!(!last.has_next());
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Paginated::new(vec![1, 2], 12, Pagination::new(2, 2)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 12);
        assert_eq!(page.page, 2);
    }
}
