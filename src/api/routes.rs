use serde::{Deserialize, Serialize};

/// Pagination parameters accepted by every list endpoint. `page` takes
/// precedence over a raw `offset` when both are sent.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        match self.page {
            Some(page) if page > 1 => (page - 1) * self.limit(),
            _ => self.offset.unwrap_or(0).max(0),
        }
    }
}

/// Standard list envelope: total row count, page count for the requested
/// limit, and the page itself.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub total_pages: i64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(count: i64, limit: i64, results: Vec<T>) -> Self {
        let total_pages = if limit > 0 {
            (count as f64 / limit as f64).ceil() as i64
        } else {
            0
        };
        Self {
            count,
            total_pages,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);

        let params = PaginationParams {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(params.limit(), 100);

        let params = PaginationParams {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn page_overrides_offset() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(3),
            page: Some(4),
        };
        assert_eq!(params.offset(), 60);

        let params = PaginationParams {
            limit: Some(20),
            offset: Some(3),
            page: Some(1),
        };
        assert_eq!(params.offset(), 3);
    }

    #[test]
    fn negative_offset_is_clamped() {
        let params = PaginationParams {
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Paginated<i32> = Paginated::new(21, 10, vec![]);
        assert_eq!(page.total_pages, 3);

        let page: Paginated<i32> = Paginated::new(0, 10, vec![]);
        assert_eq!(page.total_pages, 0);
    }
}
