use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&limit=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Paginated result envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub limit: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<i64>,
    pub next_page: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: i64, request: PageRequest) -> Self {
        let limit = request.limit();
        let page = request.page();
        let total_pages = if total_docs == 0 {
            0
        } else {
            (total_docs + limit - 1) / limit
        };
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Page::new(Vec::new(), 0, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}
