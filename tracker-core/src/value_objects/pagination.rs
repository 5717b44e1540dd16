use serde::{Deserialize, Serialize};

use super::ids::OrderId;

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(current_page: u32, total_elements: u64, total_pages: u32) -> Self {
        Pagination {
            current_page,
            total_elements,
            total_pages,
        }
    }
}

/// One page of a collection as served by the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Page { items, pagination }
    }
}

/// Parameters of a paged fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Owning instance (e.g. the order whose alarms are listed)
    pub scope: Option<OrderId>,
    pub page: u32,
    pub size: u32,
    pub sort: String,
    pub filter: Vec<String>,
}

impl PageQuery {
    pub fn new(page: u32, size: u32, sort: impl Into<String>) -> Self {
        PageQuery {
            scope: None,
            page,
            size,
            sort: sort.into(),
            filter: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<OrderId>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_filter(mut self, filter: Vec<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Scope id, ignoring blank ids
    pub fn scope_id(&self) -> Option<&OrderId> {
        self.scope.as_ref().filter(|id| !id.is_empty())
    }
}

/// Number of pages needed for `total_elements` at `page_size` per page.
pub fn total_pages(total_elements: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_elements.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}
