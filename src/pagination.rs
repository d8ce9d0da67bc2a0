//! Page-number pagination for list endpoints (`?page=N`, 1-based).

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: u32) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }
        Ok(Self { page, page_size: i64::from(page_size) })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Wraps one page of results. Any page past the last one is a 404, except page 1.
    pub fn into_page<T>(self, count: i64, results: Vec<T>, uri: &Uri) -> AppResult<Page<T>> {
        if self.page > 1 && self.offset() >= count {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }
        let next = (self.offset() + self.page_size < count).then(|| page_link(uri, self.page + 1));
        let previous = (self.page > 1).then(|| page_link(uri, self.page - 1));
        Ok(Page { count, next, previous, results })
    }
}

/// Rebuilds the request path with `page` replaced. Page 1 drops the parameter.
fn page_link(uri: &Uri, page: i64) -> String {
    let mut params: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && *p != "page" && !p.starts_with("page="))
        .collect();
    let page_param = format!("page={}", page);
    if page > 1 {
        params.push(&page_param);
    }
    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}
