use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&page_size=` query parameters shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    /// PostgREST `limit`/`offset` suffix, e.g. `limit=10&offset=20`.
    pub fn to_query(&self) -> String {
        format!("limit={}&offset={}", self.page_size(), self.offset())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(query: &PageQuery, results: Vec<T>) -> Self {
        Self {
            page: query.page(),
            page_size: query.page_size(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 10);
        assert_eq!(query.to_query(), "limit=10&offset=0");
    }

    #[test]
    fn page_size_is_capped() {
        let query = PageQuery { page: Some(3), page_size: Some(500) };
        assert_eq!(query.page_size(), MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 200);
    }

    #[test]
    fn last_possible_page_does_not_overflow() {
        let query = PageQuery { page: Some(u32::MAX), page_size: Some(10) };
        assert_eq!(query.offset(), 42_949_672_940);
        assert_eq!(query.to_query(), "limit=10&offset=42949672940");

        let widest = PageQuery { page: Some(u32::MAX), page_size: Some(u32::MAX) };
        assert_eq!(widest.offset(), u64::from(u32::MAX - 1) * u64::from(MAX_PAGE_SIZE));
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let query = PageQuery { page: Some(0), page_size: Some(0) };
        assert_eq!(query.to_query(), "limit=10&offset=0");
    }
}
