//! Page-based pagination utilities.

use serde::Serialize;

/// Page sizes a client may ask for.
pub const ALLOWED_PER_PAGE: [i64; 2] = [6, 9];

/// Page size used when the client asks for nothing or for an unsupported size.
pub const DEFAULT_PER_PAGE: i64 = 6;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Builds a page request from raw query values.
    ///
    /// Unsupported page sizes fall back to [`DEFAULT_PER_PAGE`] rather than
    /// failing the request, and pages below 1 are clamped to the first page.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1),
            per_page: normalize_per_page(per_page),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Number of rows to fetch.
    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Returns the requested page size if allowed, otherwise the default.
pub fn normalize_per_page(per_page: Option<i64>) -> i64 {
    match per_page {
        Some(size) if ALLOWED_PER_PAGE.contains(&size) => size,
        _ => DEFAULT_PER_PAGE,
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PageMeta {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    /// 1-based index of the first item on this page, if the page is non-empty.
    pub from: Option<i64>,
    /// 1-based index of the last item on this page, if the page is non-empty.
    pub to: Option<i64>,
}

impl PageMeta {
    /// Computes metadata for `request` given the total row count and the
    /// number of rows actually returned.
    pub fn new(request: PageRequest, total: i64, returned: usize) -> Self {
        let last_page = if total <= 0 {
            1
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        let (from, to) = if returned == 0 {
            (None, None)
        } else {
            let from = request.offset() + 1;
            (Some(from), Some(from + returned as i64 - 1))
        };

        Self {
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_request() {
        let req = PageRequest::default();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 6);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_allowed_page_sizes() {
        assert_eq!(normalize_per_page(Some(6)), 6);
        assert_eq!(normalize_per_page(Some(9)), 9);
    }

    #[test]
    fn test_unsupported_page_size_falls_back() {
        assert_eq!(normalize_per_page(Some(7)), DEFAULT_PER_PAGE);
        assert_eq!(normalize_per_page(Some(0)), DEFAULT_PER_PAGE);
        assert_eq!(normalize_per_page(Some(-9)), DEFAULT_PER_PAGE);
        assert_eq!(normalize_per_page(Some(1000)), DEFAULT_PER_PAGE);
        assert_eq!(normalize_per_page(None), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_page_below_one_is_clamped() {
        assert_eq!(PageRequest::new(Some(0), None).page, 1);
        assert_eq!(PageRequest::new(Some(-3), None).page, 1);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(9));
        assert_eq!(req.offset(), 18);
        assert_eq!(req.limit(), 9);
    }

    #[test]
    fn test_page_meta_full_pages() {
        let meta = PageMeta::new(PageRequest::new(Some(2), Some(6)), 14, 6);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.from, Some(7));
        assert_eq!(meta.to, Some(12));
    }

    #[test]
    fn test_page_meta_partial_last_page() {
        let meta = PageMeta::new(PageRequest::new(Some(3), Some(6)), 14, 2);
        assert_eq!(meta.from, Some(13));
        assert_eq!(meta.to, Some(14));
    }

    #[test]
    fn test_page_meta_empty() {
        let meta = PageMeta::new(PageRequest::default(), 0, 0);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.from, None);
        assert_eq!(meta.to, None);
    }

    #[test]
    fn test_page_meta_serializes_snake_case() {
        let meta = PageMeta::new(PageRequest::default(), 1, 1);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["current_page"], 1);
        assert_eq!(json["last_page"], 1);
    }
}
