//! Offset pagination helpers
//!
//! Every list endpoint returns a [`PageMeta`] block alongside the rows.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Sort direction shared by all list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Normalized page/limit pair from query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Clamp raw query values: page >= 1, limit in [1, MAX_PAGE_LIMIT].
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        Self { page, limit }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block included in list responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(req: &PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(req.limit());
        Self {
            page: req.page(),
            limit: req.limit(),
            total_count,
            total_pages,
            has_next: req.page() < total_pages,
            has_prev: req.page() > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamping() {
        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!(req.page(), 1);
        assert_eq!(req.limit(), 1);

        let req = PageRequest::new(Some(3), Some(10_000));
        assert_eq!(req.limit(), MAX_PAGE_LIMIT);
        assert_eq!(req.offset(), 2 * MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_page_meta_rounding() {
        let req = PageRequest::new(Some(1), Some(20));
        let meta = PageMeta::new(&req, 41);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_page_meta_last_page() {
        let req = PageRequest::new(Some(3), Some(20));
        let meta = PageMeta::new(&req, 41);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_page_meta_empty() {
        let req = PageRequest::default();
        let meta = PageMeta::new(&req, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }
}
