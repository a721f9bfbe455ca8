use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination query parameters: `?page=` (min 1) and `?size=` (1..=100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PaginationParams {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.page < 1 {
            return Err(ApiError::bad_request("page must be at least 1"));
        }
        if self.size < 1 || self.size > MAX_PAGE_SIZE {
            return Err(ApiError::bad_request(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> i64 {
        self.size * (self.page - 1)
    }
}

/// One bounded slice of an ordered result set plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedData<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub pages: i64,
    pub size: i64,
    pub total: i64,
}

/// `ceil(total / size)`, with a degenerate guard so a zero size never
/// divides.
pub fn total_pages(total: i64, size: i64) -> i64 {
    if size > 0 {
        (total + size - 1) / size
    } else {
        1
    }
}
